//! Sweep driving with in-band frequency annotation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use iqrec_core::{
    Error, InputWindow, Message, MessagePort, MessageReceiver, Result, StreamTransform, Value,
};

use crate::sweeper::default_retune_cmd_name;

/// One `fc32` sample stamped with the center frequency in effect for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatedSample {
    pub center_freq: f32,
    pub re: f32,
    pub im: f32,
}

/// Configuration for [`SweepAnnotator`], fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Lowest frequency bound of the sweep.
    pub min_freq: f32,
    /// Highest center frequency in the plan (inclusive).
    pub max_freq: f32,
    /// Frequency increment per step.
    pub freq_step: f32,
    /// Modelled sample rate; the sweep starts at `min_freq + sample_rate / 2`.
    pub sample_rate: u32,
    /// Samples to spend at each frequency.
    pub samples_per_step: u64,
    /// Key under which retune commands carry the new frequency.
    #[serde(default = "default_retune_cmd_name")]
    pub retune_cmd_name: String,
}

/// Drives a sweep while stamping every sample with the active center
/// frequency, so downstream consumers learn the sweep position in-band.
///
/// Unlike [`FrequencySweeper`](crate::sweeper::FrequencySweeper), the
/// start frequency `min_freq + sample_rate / 2` is published as soon as
/// the first work call runs, and the plan wraps back to that start
/// frequency rather than to `min_freq`.
pub struct SweepAnnotator {
    config: AnnotatorConfig,
    freq0: f32,
    nsamples: u64,
    active_freq: f32,
    published_start: bool,
    port: MessagePort,
}

impl SweepAnnotator {
    /// Validate `config` and construct an annotator dwelling at the start
    /// frequency.
    pub fn new(config: AnnotatorConfig) -> Result<Self> {
        if config.max_freq < config.min_freq {
            return Err(Error::Configuration(format!(
                "max_freq {} is below min_freq {}",
                config.max_freq, config.min_freq
            )));
        }
        if config.freq_step <= 0.0 {
            return Err(Error::Configuration(format!(
                "freq_step must be positive, got {}",
                config.freq_step
            )));
        }
        if config.sample_rate == 0 {
            return Err(Error::Configuration("sample_rate must be positive".into()));
        }
        if config.samples_per_step == 0 {
            return Err(Error::Configuration(
                "samples_per_step must be positive".into(),
            ));
        }
        if config.retune_cmd_name.is_empty() {
            return Err(Error::Configuration(
                "retune_cmd_name must not be empty".into(),
            ));
        }

        let freq0 = config.min_freq + config.sample_rate as f32 / 2.0;
        Ok(Self {
            freq0,
            nsamples: 0,
            active_freq: freq0,
            published_start: false,
            port: MessagePort::new(),
            config,
        })
    }

    /// The frequency the sweep starts from, `min_freq + sample_rate / 2`.
    pub fn start_freq(&self) -> f32 {
        self.freq0
    }

    /// Subscribe to published retune commands.
    pub fn subscribe(&mut self) -> MessageReceiver {
        self.port.subscribe()
    }

    fn publish_retune(&self) {
        debug!(freq = self.active_freq, "publishing retune command");
        self.port.publish(&Message::single(
            &self.config.retune_cmd_name,
            Value::Float(f64::from(self.active_freq)),
        ));
    }
}

impl StreamTransform for SweepAnnotator {
    type Output = AnnotatedSample;

    fn work(&mut self, input: &InputWindow<'_>, output: &mut [AnnotatedSample]) -> Result<usize> {
        if input.item_size() != 8 {
            return Err(Error::Configuration(format!(
                "annotator expects 8-byte fc32 items, got {}-byte items",
                input.item_size()
            )));
        }

        if !self.published_start {
            // Downstream learns the start-of-sweep frequency in-band.
            self.publish_retune();
            self.published_start = true;
        }

        let n = input.len().min(output.len());
        for (slot, z) in output.iter_mut().zip(input.complex32()).take(n) {
            if self.nsamples == self.config.samples_per_step {
                self.active_freq += self.config.freq_step;
                if self.active_freq > self.config.max_freq {
                    self.active_freq = self.freq0;
                }
                self.publish_retune();
                self.nsamples = 0;
            }
            *slot = AnnotatedSample {
                center_freq: self.active_freq,
                re: z.re,
                im: z.im,
            };
            self.nsamples += 1;
        }
        Ok(n)
    }
}
