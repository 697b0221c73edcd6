//! Sweep control blocks and the deterministic staircase validation
//! source.
//!
//! The [`FrequencySweeper`] drives retuning of an upstream receiver on a
//! sample-counted cadence; the [`SweepAnnotator`] does the same while
//! stamping every sample with the center frequency in effect for it; the
//! [`TaggedStaircase`] produces an analytically known tagged stream so the
//! capture pipeline can be validated without a physical radio.

pub mod annotator;
pub mod staircase;
pub mod sweeper;

pub use annotator::{AnnotatedSample, AnnotatorConfig, SweepAnnotator};
pub use staircase::{StaircaseConfig, TaggedStaircase, FREQ_TAG_KEY};
pub use sweeper::{FrequencySweeper, SweeperConfig};
