//! End-to-end validation: tagged staircase into the batched sink.
//!
//! The staircase emits an analytically known stepped stream; capturing it
//! in sweep mode and parsing the detached headers back must recover the
//! exact `(frequency, step_length)` sequence the staircase produced, with
//! pairs split at batch boundaries summing back to the original.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use num_complex::Complex32;
use tempfile::TempDir;

use iqrec_capture::{read_detached_header, BatchedFileSink, CaptureConfig};
use iqrec_core::{InputWindow, OutputWindow, SampleFormat, StreamSink, StreamSource, Tag};
use iqrec_sweep::{StaircaseConfig, TaggedStaircase, FREQ_TAG_KEY};

fn fc32_bytes(samples: &[Complex32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 8);
    for z in samples {
        bytes.extend_from_slice(&z.re.to_ne_bytes());
        bytes.extend_from_slice(&z.im.to_ne_bytes());
    }
    bytes
}

/// Run the staircase for `total` samples in windows of `chunk` slots.
fn generate(total: usize, chunk: usize) -> (Vec<Complex32>, Vec<Tag>) {
    let mut staircase = TaggedStaircase::new(StaircaseConfig {
        min_samples_per_step: 3,
        max_samples_per_step: 5,
        step_increment: 1,
        hop_freq: 10.0,
        sample_rate: 20.0,
    })
    .unwrap();

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

/// Feed `bytes` through the sink in windows of at most `chunk` items,
/// honoring partial consumption. Sleeps between calls so successive
/// batches get distinct millisecond timestamps.
fn capture(sink: &mut BatchedFileSink, bytes: &[u8], tags: &[Tag], chunk: usize) {
    let total = bytes.len() / 8;
    let mut read = 0usize;
    while read < total {
        std::thread::sleep(Duration::from_millis(2));
        let end = (read + chunk).min(total);
        let window_tags: Vec<Tag> = tags
            .iter()
            .filter(|tag| tag.offset >= read as u64 && tag.offset < end as u64)
            .cloned()
            .collect();
        let window = InputWindow::new(
            &bytes[read * 8..end * 8],
            8,
            read as u64,
            &window_tags,
        )
        .unwrap();
        let consumed = sink.work(&window).unwrap();
        assert!(consumed > 0, "sink made no progress");
        read += consumed;
    }
}

fn files_with_ext(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    files
}

/// Merge adjacent pairs with equal frequency, undoing batch-boundary
/// splits.
fn coalesce(pairs: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut merged: Vec<(f32, f32)> = Vec::new();
    for &(freq, count) in pairs {
        match merged.last_mut() {
            Some((last_freq, last_count)) if *last_freq == freq => *last_count += count,
            _ => merged.push((freq, count)),
        }
    }
    merged
}

/// The `(frequency, step_length)` attribution the staircase's tags imply
/// for the first `flushed` samples.
fn expected_segments(tags: &[Tag], flushed: u64) -> Vec<(f32, f32)> {
    let mut segments = Vec::new();
    for (i, tag) in tags.iter().enumerate() {
        if tag.offset >= flushed {
            break;
        }
        let end = tags
            .get(i + 1)
            .map_or(flushed, |next| next.offset.min(flushed));
        segments.push((
            tag.value.as_f64().unwrap() as f32,
            (end - tag.offset) as f32,
        ));
    }
    segments
}

#[test]
fn test_staircase_capture_round_trips_through_headers() {
    let (samples, tags) = generate(64, 7);
    assert!(tags.iter().all(|t| t.key == FREQ_TAG_KEY));
    let bytes = fc32_bytes(&samples);

    let dir = TempDir::new().unwrap();
    let mut sink = BatchedFileSink::new(CaptureConfig {
        dir: dir.path().to_path_buf(),
        file_tag: "staircase".to_string(),
        input_type: SampleFormat::Fc32,
        batch_size: 1.0,
        sample_rate: 10,
        group_by_date: false,
        is_tagged: true,
        freq_tag_key: FREQ_TAG_KEY.to_string(),
        initial_tag_value: 0.0,
    })
    .unwrap();
    assert_eq!(sink.batch_items(), 10);

    capture(&mut sink, &bytes, &tags, 7);
    drop(sink); // 64 samples at 10 per batch: 6 closed, 4 discarded

    let data_files = files_with_ext(dir.path(), "fc32");
    let header_files = files_with_ext(dir.path(), "hdr");
    assert_eq!(data_files.len(), 6);
    assert_eq!(header_files.len(), 6);

    // Every closed data file holds exactly one batch, in stream order.
    let mut recovered = Vec::new();
    for file in &data_files {
        let contents = fs::read(file).unwrap();
        assert_eq!(contents.len(), 10 * 8);
        recovered.extend_from_slice(&contents);
    }
    assert_eq!(recovered, bytes[..60 * 8]);

    // Per batch: positive pair counts summing to the batch size.
    let mut all_pairs = Vec::new();
    for file in &header_files {
        let pairs = read_detached_header(file).unwrap();
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|&(_, count)| count > 0.0));
        let total: f32 = pairs.iter().map(|&(_, count)| count).sum();
        assert_eq!(total, 10.0);
        all_pairs.extend(pairs);
    }

    // Coalescing the batch-boundary splits recovers the staircase's own
    // (frequency, step_length) sequence over the flushed region.
    assert_eq!(coalesce(&all_pairs), expected_segments(&tags, 60));
}

#[test]
fn test_round_trip_is_stable_across_work_sizes() {
    let (samples, tags) = generate(30, 11);
    let bytes = fc32_bytes(&samples);

    for chunk in [1, 4, 30] {
        let dir = TempDir::new().unwrap();
        let mut sink = BatchedFileSink::new(CaptureConfig {
            dir: dir.path().to_path_buf(),
            file_tag: "staircase".to_string(),
            input_type: SampleFormat::Fc32,
            batch_size: 0.5,
            sample_rate: 12, // 6 items per batch
            group_by_date: false,
            is_tagged: true,
            freq_tag_key: FREQ_TAG_KEY.to_string(),
            initial_tag_value: 0.0,
        })
        .unwrap();
        assert_eq!(sink.batch_items(), 6);

        capture(&mut sink, &bytes, &tags, chunk);
        drop(sink);

        let header_files = files_with_ext(dir.path(), "hdr");
        assert_eq!(header_files.len(), 5);
        let mut all_pairs = Vec::new();
        for file in &header_files {
            all_pairs.extend(read_detached_header(file).unwrap());
        }
        assert_eq!(
            coalesce(&all_pairs),
            expected_segments(&tags, 30),
            "chunk size {chunk}"
        );
    }
}
