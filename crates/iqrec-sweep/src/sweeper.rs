//! Sample-counted frequency sweeping.

use serde::{Deserialize, Serialize};
use tracing::debug;

use iqrec_core::{
    Error, InputWindow, Message, MessagePort, MessageReceiver, Result, SampleFormat, StreamSink,
    Value,
};

pub(crate) fn default_retune_cmd_name() -> String {
    "freq".to_string()
}

/// Configuration for [`FrequencySweeper`], fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Lowest center frequency in the plan (inclusive). Assumed already in
    /// effect on the receiver when the sweep starts.
    pub min_freq: f32,
    /// Highest center frequency in the plan (inclusive).
    pub max_freq: f32,
    /// Frequency increment per step.
    pub hop_freq: f32,
    /// Seconds to dwell at each frequency. Floored to a whole number of
    /// samples so the elapsed time per step never surpasses it.
    pub dwell_time: f64,
    /// Input sample rate in samples per second.
    pub sample_rate: u32,
    /// Key under which the retune command carries the new frequency
    /// (consult the receiver block for the name it expects).
    #[serde(default = "default_retune_cmd_name")]
    pub retune_cmd_name: String,
    /// Sample format of the input stream.
    pub input_type: SampleFormat,
}

/// A sink-shaped control block retuning an upstream receiver.
///
/// Consumes its input stream unconditionally, measuring dwell time by
/// counting samples, and publishes a retune command every
/// `floor(dwell_time × sample_rate)` samples, cycling through the linear
/// plan `min_freq, min_freq + hop_freq, … ≤ max_freq`.
///
/// The initial frequency is never published: `min_freq` is assumed already
/// in effect, so the first command carries `min_freq + hop_freq`. There
/// are no acknowledgements and no retries. The sweeper also never writes
/// stream tags; the receiver is expected to tag its own output where each
/// retune takes effect.
#[derive(Debug)]
pub struct FrequencySweeper {
    config: SweeperConfig,
    item_size: usize,
    samples_per_step: u64,
    nsamples: u64,
    active_freq: f32,
    port: MessagePort,
}

impl FrequencySweeper {
    /// Validate `config` and construct a sweeper dwelling at `min_freq`.
    pub fn new(config: SweeperConfig) -> Result<Self> {
        if config.max_freq < config.min_freq {
            return Err(Error::Configuration(format!(
                "max_freq {} is below min_freq {}",
                config.max_freq, config.min_freq
            )));
        }
        if config.hop_freq <= 0.0 {
            return Err(Error::Configuration(format!(
                "hop_freq must be positive, got {}",
                config.hop_freq
            )));
        }
        if config.dwell_time <= 0.0 {
            return Err(Error::Configuration(format!(
                "dwell_time must be positive, got {}",
                config.dwell_time
            )));
        }
        if config.sample_rate == 0 {
            return Err(Error::Configuration("sample_rate must be positive".into()));
        }
        if config.retune_cmd_name.is_empty() {
            return Err(Error::Configuration(
                "retune_cmd_name must not be empty".into(),
            ));
        }

        let samples_per_step = (config.dwell_time * f64::from(config.sample_rate)).floor() as u64;
        if samples_per_step == 0 {
            return Err(Error::Configuration(format!(
                "a dwell of {}s at {} S/s spans no samples",
                config.dwell_time, config.sample_rate
            )));
        }

        Ok(Self {
            item_size: config.input_type.item_size(),
            samples_per_step,
            nsamples: 0,
            active_freq: config.min_freq,
            port: MessagePort::new(),
            config,
        })
    }

    /// Samples consumed between successive retunes,
    /// `floor(dwell_time × sample_rate)`.
    pub fn samples_per_step(&self) -> u64 {
        self.samples_per_step
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

impl StreamSink for FrequencySweeper {
    fn work(&mut self, input: &InputWindow<'_>) -> Result<usize> {
        if input.item_size() != self.item_size {
            return Err(Error::Configuration(format!(
                "input window item size {} does not match configured '{}' ({} bytes)",
                input.item_size(),
                self.config.input_type,
                self.item_size
            )));
        }

        for _ in 0..input.len() {
            // Measure elapsed time by counting samples.
            self.nsamples += 1;
            if self.nsamples == self.samples_per_step {
                self.active_freq += self.config.hop_freq;
                if self.active_freq > self.config.max_freq {
                    self.active_freq = self.config.min_freq;
                }
                self.publish_retune();
                self.nsamples = 0;
            }
        }
        Ok(input.len())
    }
}
