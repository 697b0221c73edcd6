//! Batched capture of IQ streams to timestamped files.
//!
//! The [`BatchedFileSink`] splits an unbounded input stream into batches
//! of exactly `floor(batch_size × sample_rate)` items, persisting each
//! batch to its own binary file named by the UTC wall-clock time of the
//! batch's first buffered sample. In sweep mode a detached `.hdr` file per
//! batch records which consecutive sample ranges belong to which center
//! frequency, reconstructed from `rx_freq`-style stream tags.

mod binio;
pub mod header;
pub mod path;
pub mod sink;

pub use header::read_detached_header;
pub use path::{batch_file_path, HEADER_EXTENSION};
pub use sink::{BatchedFileSink, CaptureConfig};
