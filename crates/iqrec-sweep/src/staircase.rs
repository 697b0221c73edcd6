//! Deterministic stepped validation source.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use iqrec_core::{Error, OutputWindow, Result, StreamSource, Value};

/// Stream-tag key used for center-frequency annotations.
pub const FREQ_TAG_KEY: &str = "rx_freq";

const SOURCE_ID: &str = "tagged_staircase";

/// Configuration for [`TaggedStaircase`], fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaircaseConfig {
    /// Length of the shortest step in samples.
    pub min_samples_per_step: usize,
    /// Steps never grow beyond this length.
    pub max_samples_per_step: usize,
    /// Samples added to the step length after each step.
    pub step_increment: usize,
    /// Synthetic frequency increment per step.
    pub hop_freq: f32,
    /// Modelled sample rate; the synthetic sweep starts at
    /// `sample_rate / 2`, placing the spectrum edge at 0 Hz.
    pub sample_rate: f32,
}

/// A source emitting an analytically known stepped stream for validating
/// sweep capture end to end, without a physical radio.
///
/// The real part of every sample is the 1-based index of the step it
/// belongs to; imaginary parts are zero. Step lengths follow the
/// arithmetic progression `min, min + increment, …` and wrap back to `min`
/// as soon as the next length would exceed `max`, resetting the step index
/// and the synthetic frequency. The first sample of every step carries an
/// `rx_freq` tag with the synthetic center frequency, mimicking what a
/// retuned receiver would emit.
pub struct TaggedStaircase {
    config: StaircaseConfig,
    initial_freq: f32,
    nstep: u64,
    nsamples: usize,
    samples_per_step: usize,
    active_freq: f32,
}

impl TaggedStaircase {
    /// Validate `config` and construct a staircase at the start of its
    /// first step.
    pub fn new(config: StaircaseConfig) -> Result<Self> {
        if config.min_samples_per_step == 0 {
            return Err(Error::Configuration(
                "min_samples_per_step must be positive".into(),
            ));
        }
        if config.max_samples_per_step < config.min_samples_per_step {
            return Err(Error::Configuration(format!(
                "max_samples_per_step {} is below min_samples_per_step {}",
                config.max_samples_per_step, config.min_samples_per_step
            )));
        }
        if config.sample_rate <= 0.0 {
            return Err(Error::Configuration(format!(
                "sample_rate must be positive, got {}",
                config.sample_rate
            )));
        }

        let initial_freq = config.sample_rate / 2.0;
        Ok(Self {
            initial_freq,
            nstep: 0,
            nsamples: 0,
            samples_per_step: config.min_samples_per_step,
            active_freq: initial_freq,
            config,
        })
    }
}

impl StreamSource for TaggedStaircase {
    type Item = Complex32;

    fn work(&mut self, output: &mut OutputWindow<'_, Complex32>) -> Result<usize> {
        let len = output.len();
        for n in 0..len {
            if self.nsamples == 0 {
                // Tag the first sample of each step.
                output.add_tag(
                    output.nitems_written() + n as u64,
                    FREQ_TAG_KEY,
                    Value::Float(f64::from(self.active_freq)),
                    SOURCE_ID,
                );
            }
            output.slots()[n] = Complex32::new((self.nstep + 1) as f32, 0.0);
            self.nsamples += 1;

            if self.nsamples == self.samples_per_step {
                // Start a new step: longer by the fixed increment, one hop
                // up in frequency.
                self.nstep += 1;
                self.nsamples = 0;
                self.active_freq += self.config.hop_freq;
                self.samples_per_step += self.config.step_increment;

                if self.samples_per_step > self.config.max_samples_per_step {
                    self.samples_per_step = self.config.min_samples_per_step;
                    self.nstep = 0;
                    self.active_freq = self.initial_freq;
                }
            }
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqrec_core::Tag;

    fn config() -> StaircaseConfig {
        StaircaseConfig {
            min_samples_per_step: 3,
            max_samples_per_step: 5,
            step_increment: 1,
            hop_freq: 10.0,
            sample_rate: 20.0,
        }
    }

    /// Produce `total` samples in windows of `chunk` slots.
    fn generate(
        staircase: &mut TaggedStaircase,
        total: usize,
        chunk: usize,
    ) -> (Vec<Complex32>, Vec<Tag>) {
        let mut samples = Vec::with_capacity(total);
        let mut tags = Vec::new();
        let mut written = 0usize;
        while written < total {
            let n = chunk.min(total - written);
            let mut slots = vec![Complex32::new(0.0, 0.0); n];
            let mut window = OutputWindow::new(&mut slots, written as u64);
            assert_eq!(staircase.work(&mut window).unwrap(), n);
            tags.extend(window.into_tags());
            samples.extend_from_slice(&slots);
            written += n;
        }
        (samples, tags)
    }

    #[test]
    fn test_step_shape_and_tags() {
        let mut staircase = TaggedStaircase::new(config()).unwrap();
        let (samples, tags) = generate(&mut staircase, 20, 4);

        let real: Vec<f32> = samples.iter().map(|z| z.re).collect();
        #[rustfmt::skip]
        let expected = vec![
            1.0, 1.0, 1.0,
            2.0, 2.0, 2.0, 2.0,
            3.0, 3.0, 3.0, 3.0, 3.0,
            1.0, 1.0, 1.0,
            2.0, 2.0, 2.0, 2.0,
            3.0,
        ];
        assert_eq!(real, expected);
        assert!(samples.iter().all(|z| z.im == 0.0));

        let offsets: Vec<u64> = tags.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 3, 7, 12, 15, 19]);

        let freqs: Vec<f64> = tags
            .iter()
            .map(|t| t.value.as_f64().unwrap())
            .collect();
        assert_eq!(freqs, vec![10.0, 20.0, 30.0, 10.0, 20.0, 30.0]);

        assert!(tags.iter().all(|t| t.key == FREQ_TAG_KEY));
        assert!(tags.iter().all(|t| t.source == "tagged_staircase"));
    }

    #[test]
    fn test_shape_is_stable_across_fragmented_calls() {
        for chunk in [1, 3, 5, 20] {
            let mut staircase = TaggedStaircase::new(config()).unwrap();
            let (samples, tags) = generate(&mut staircase, 20, chunk);

            let reference_real: Vec<f32> = {
                let mut staircase = TaggedStaircase::new(config()).unwrap();
                let (reference, _) = generate(&mut staircase, 20, 7);
                reference.iter().map(|z| z.re).collect()
            };
            let real: Vec<f32> = samples.iter().map(|z| z.re).collect();
            assert_eq!(real, reference_real, "chunk size {chunk}");
            assert_eq!(tags.len(), 6);
        }
    }

    #[test]
    fn test_single_length_steps() {
        let cfg = StaircaseConfig {
            min_samples_per_step: 2,
            max_samples_per_step: 2,
            step_increment: 1,
            hop_freq: 5.0,
            sample_rate: 10.0,
        };
        let mut staircase = TaggedStaircase::new(cfg).unwrap();
        let (samples, tags) = generate(&mut staircase, 6, 6);

        // Every step wraps immediately, so the output never leaves step 1.
        let real: Vec<f32> = samples.iter().map(|z| z.re).collect();
        assert_eq!(real, vec![1.0; 6]);
        let freqs: Vec<f64> = tags.iter().map(|t| t.value.as_f64().unwrap()).collect();
        assert_eq!(freqs, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_config_validation() {
        let mut cfg = config();
        cfg.min_samples_per_step = 0;
        assert!(TaggedStaircase::new(cfg).is_err());

        let mut cfg = config();
        cfg.max_samples_per_step = 2;
        assert!(TaggedStaircase::new(cfg).is_err());

        let mut cfg = config();
        cfg.sample_rate = 0.0;
        assert!(TaggedStaircase::new(cfg).is_err());
    }
}
