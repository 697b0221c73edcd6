//! The batched file sink.
//!
//! # Architecture
//!
//! ```text
//! IQ stream (+ rx_freq tags) → BatchedFileSink → <timestamp>_<tag>.<ext>
//!                                              → <timestamp>_<tag>.hdr   (sweep mode)
//! ```
//!
//! The sink buffers exactly one batch in memory. A batch is created the
//! moment the sink is called with input available (or right after the
//! previous batch flushed), fills monotonically, and closes when exactly
//! `floor(batch_size × sample_rate)` items have been buffered; at that
//! instant both files are written out and closed, and the next call starts
//! a new batch.
//!
//! In sweep mode the sink tracks an *active tag*, the most recent
//! frequency tag whose sample range is still open, and converts the tag
//! stream into `(center_frequency, sample_count)` header pairs. A tag
//! range that spans a batch boundary is split: the remainder up to the
//! boundary is attributed to the closing batch, and the active tag is
//! re-anchored to the boundary when the next batch opens.

use std::fs::{self, File};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use iqrec_core::{Error, InputWindow, Result, SampleFormat, StreamSink};

use crate::binio::{write_bytes, write_f32s};
use crate::path::{batch_file_path, HEADER_EXTENSION};

fn default_freq_tag_key() -> String {
    "rx_freq".to_string()
}

/// Configuration for [`BatchedFileSink`], fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Ancestral output directory, created on demand.
    pub dir: PathBuf,
    /// Filename identifier.
    pub file_tag: String,
    /// Sample format of the input stream; doubles as the data-file
    /// extension.
    pub input_type: SampleFormat,
    /// Seconds of stream per batch file. The item count per batch is
    /// floored so that batch duration never exceeds this value.
    pub batch_size: f64,
    /// Input sample rate in samples per second.
    pub sample_rate: u32,
    /// Store batches under `YYYY/MM/DD/` subdirectories.
    #[serde(default)]
    pub group_by_date: bool,
    /// Emit a detached header per batch attributing sample ranges to
    /// center frequencies.
    #[serde(default)]
    pub is_tagged: bool,
    /// Stream-tag key carrying the center-frequency value.
    #[serde(default = "default_freq_tag_key")]
    pub freq_tag_key: String,
    /// Center frequency assumed in effect if the first sample of the
    /// first batch carries no tag. Zero means "unset".
    #[serde(default)]
    pub initial_tag_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferState {
    Empty,
    Filling,
    Full,
}

/// The most recent frequency tag whose sample range is still open.
#[derive(Debug, Clone, Copy)]
struct ActiveTag {
    offset: u64,
    value: f32,
}

/// File handles and paths of the batch currently in progress.
#[derive(Debug)]
struct OpenBatch {
    data: File,
    data_path: PathBuf,
    header: Option<File>,
    header_path: PathBuf,
}

impl OpenBatch {
    /// Close both handles and remove the files from disk.
    fn discard(self) {
        let OpenBatch {
            data,
            data_path,
            header,
            header_path,
        } = self;
        let had_header = header.is_some();
        drop(data);
        drop(header);
        let _ = fs::remove_file(&data_path);
        if had_header {
            let _ = fs::remove_file(&header_path);
        }
    }
}

/// A sink persisting an IQ stream as a sequence of fixed-size,
/// UTC-timestamped batch files, optionally with a detached header per
/// batch.
///
/// Two batches opened within the same millisecond under the same
/// `(dir, file_tag)` resolve to the same path; the later open truncates
/// the earlier file. Callers must ensure disjoint `(dir, file_tag)` pairs
/// or millisecond-distinct opens.
///
/// Dropping the sink discards any batch in progress and removes its files
/// from disk, so every data file ever left behind holds a full batch.
#[derive(Debug)]
pub struct BatchedFileSink {
    config: CaptureConfig,
    item_size: usize,
    batch_items: usize,
    state: BufferState,
    samples: Vec<u8>,
    header_pairs: Vec<f32>,
    active: Option<ActiveTag>,
    batch: Option<OpenBatch>,
}

impl BatchedFileSink {
    /// Validate `config` and construct an idle sink. No I/O happens until
    /// the first work call with input available.
    pub fn new(config: CaptureConfig) -> Result<Self> {
        if config.file_tag.is_empty() {
            return Err(Error::Configuration("file_tag must not be empty".into()));
        }
        if config.batch_size <= 0.0 {
            return Err(Error::Configuration(format!(
                "batch_size must be positive, got {}",
                config.batch_size
            )));
        }
        if config.sample_rate == 0 {
            return Err(Error::Configuration("sample_rate must be positive".into()));
        }
        if config.is_tagged && config.freq_tag_key.is_empty() {
            return Err(Error::Configuration(
                "freq_tag_key must not be empty in sweep mode".into(),
            ));
        }

        let batch_items = (config.batch_size * f64::from(config.sample_rate)).floor() as usize;
        if batch_items == 0 {
            return Err(Error::Configuration(format!(
                "a batch of {}s at {} S/s holds no samples",
                config.batch_size, config.sample_rate
            )));
        }
        let item_size = config.input_type.item_size();
        let batch_bytes = batch_items.checked_mul(item_size).ok_or_else(|| {
            Error::Configuration(format!(
                "batch of {batch_items} items of {item_size} bytes overflows"
            ))
        })?;

        Ok(Self {
            item_size,
            batch_items,
            state: BufferState::Empty,
            samples: Vec::with_capacity(batch_bytes),
            header_pairs: Vec::new(),
            active: None,
            batch: None,
            config,
        })
    }

    /// Items per batch, `floor(batch_size × sample_rate)`.
    pub fn batch_items(&self) -> usize {
        self.batch_items
    }

    fn buffered_items(&self) -> usize {
        self.samples.len() / self.item_size
    }

    /// Establish the active tag for a batch that is about to open.
    fn init_active_tag(&mut self, input: &InputWindow<'_>) -> Result<()> {
        let key = &self.config.freq_tag_key;
        if let Some(tag) = input.tag_at(input.nitems_read(), key) {
            let value = read_freq(&tag.value, tag.offset, key)?;
            debug!(offset = tag.offset, value, "adopted frequency tag");
            self.active = Some(ActiveTag {
                offset: tag.offset,
                value,
            });
        } else if let Some(active) = self.active.as_mut() {
            // The remainder of the previous batch's last frequency carries
            // into this batch.
            active.offset = input.nitems_read();
            debug!(
                offset = active.offset,
                value = active.value,
                "re-anchored active tag"
            );
        } else if self.config.initial_tag_value != 0.0 {
            self.active = Some(ActiveTag {
                offset: input.nitems_read(),
                value: self.config.initial_tag_value as f32,
            });
        } else {
            return Err(Error::UndefinedTagState(format!(
                "first sample of the first batch carries no '{key}' tag \
                 and no initial tag value is configured"
            )));
        }
        Ok(())
    }

    /// Time-stamp, name, and open the files of a new batch.
    fn open_batch(&mut self, input: &InputWindow<'_>) -> Result<()> {
        let opened_at = Utc::now();

        if self.config.is_tagged {
            self.init_active_tag(input)?;
        }

        let data_path = batch_file_path(
            &self.config.dir,
            &self.config.file_tag,
            self.config.input_type.code(),
            self.config.group_by_date,
            opened_at,
        );
        let header_path = batch_file_path(
            &self.config.dir,
            &self.config.file_tag,
            HEADER_EXTENSION,
            self.config.group_by_date,
            opened_at,
        );

        if let Some(parent) = data_path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;
        }
        let data = File::create(&data_path).map_err(|source| Error::io(&data_path, source))?;
        let header = if self.config.is_tagged {
            Some(File::create(&header_path).map_err(|source| Error::io(&header_path, source))?)
        } else {
            None
        };

        info!(
            path = %data_path.display(),
            items = self.batch_items,
            "opened batch"
        );
        self.batch = Some(OpenBatch {
            data,
            data_path,
            header,
            header_path,
        });
        self.state = BufferState::Filling;
        Ok(())
    }

    /// Convert the tags of the consumed range into header pairs.
    ///
    /// Consumes tags strictly above the active offset and strictly below
    /// the consumed end; a tag at exactly the consumed end annotates the
    /// first unconsumed item and is redelivered on the next call.
    fn collect_tags(&mut self, input: &InputWindow<'_>, consumed: usize) -> Result<()> {
        let consumed_end = input.nitems_read() + consumed as u64;
        let mut active = self.active.ok_or_else(|| {
            Error::UndefinedTagState("sweep-mode batch filling with no active tag".into())
        })?;
        let key = &self.config.freq_tag_key;
        let header_pairs = &mut self.header_pairs;

        for tag in input.tags_in_range(active.offset + 1, consumed_end, key) {
            let value = read_freq(&tag.value, tag.offset, key)?;
            header_pairs.push(active.value);
            header_pairs.push((tag.offset - active.offset) as f32);
            active = ActiveTag {
                offset: tag.offset,
                value,
            };
        }

        if self.state == BufferState::Full {
            // The remainder of the batch belongs to the last known
            // frequency; the active tag is re-anchored when the next batch
            // opens.
            header_pairs.push(active.value);
            header_pairs.push((consumed_end - active.offset) as f32);
        }

        self.active = Some(active);
        Ok(())
    }

    fn write_out(&self, batch: &mut OpenBatch) -> Result<()> {
        write_bytes(&mut batch.data, &self.samples, &batch.data_path)?;
        if let Some(header) = batch.header.as_mut() {
            write_f32s(header, &self.header_pairs, &batch.header_path)?;
        }
        Ok(())
    }

    /// Persist the full batch and return the sink to the idle state.
    fn flush_batch(&mut self) -> Result<()> {
        let mut batch = self.batch.take().ok_or_else(|| {
            Error::Configuration("batch buffer full with no open batch files".into())
        })?;

        if let Err(err) = self.write_out(&mut batch) {
            // A torn batch is useless; remove it rather than leave a short
            // file behind.
            batch.discard();
            return Err(err);
        }

        info!(
            path = %batch.data_path.display(),
            bytes = self.samples.len(),
            header_pairs = self.header_pairs.len() / 2,
            "flushed batch"
        );
        self.samples.clear();
        self.header_pairs.clear();
        self.state = BufferState::Empty;
        Ok(())
    }
}

impl StreamSink for BatchedFileSink {
    fn work(&mut self, input: &InputWindow<'_>) -> Result<usize> {
        if input.item_size() != self.item_size {
            return Err(Error::Configuration(format!(
                "input window item size {} does not match configured '{}' ({} bytes)",
                input.item_size(),
                self.config.input_type,
                self.item_size
            )));
        }
        if input.is_empty() {
            return Ok(0);
        }

        if self.state == BufferState::Empty {
            self.open_batch(input)?;
        }

        let consumed = input.len().min(self.batch_items - self.buffered_items());
        self.samples
            .extend_from_slice(&input.bytes()[..consumed * self.item_size]);
        if self.buffered_items() == self.batch_items {
            self.state = BufferState::Full;
        }

        if self.config.is_tagged {
            self.collect_tags(input, consumed)?;
        }

        if self.state == BufferState::Full {
            self.flush_batch()?;
        }

        Ok(consumed)
    }
}

impl Drop for BatchedFileSink {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            warn!(
                path = %batch.data_path.display(),
                buffered_items = self.buffered_items(),
                "discarding partial batch at teardown"
            );
            batch.discard();
        }
    }
}

/// Read a tag payload as a center frequency.
fn read_freq(value: &iqrec_core::Value, offset: u64, key: &str) -> Result<f32> {
    value
        .as_f64()
        .map(|freq| freq as f32)
        .ok_or_else(|| {
            Error::TagValue(format!(
                "tag '{key}' at offset {offset} carries a non-numeric {} payload",
                value.type_name()
            ))
        })
}
