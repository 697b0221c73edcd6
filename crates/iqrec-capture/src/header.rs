//! Detached sweep headers.
//!
//! A batch's `.hdr` file is a stream of host-byte-order IEEE-754
//! single-precision floats interpreted as consecutive
//! `(center_frequency_hz, sample_count)` pairs: in order of occurrence
//! within the batch, how many consecutive samples of the data file belong
//! to each center frequency. The pair counts of a batch always sum to the
//! batch size in samples. There is no framing; consumers infer the pair
//! count from the file size.

use std::fs;
use std::io;
use std::path::Path;

use iqrec_core::{Error, Result};

/// Parse a detached header file into `(center_frequency_hz, sample_count)`
/// pairs.
pub fn read_detached_header(path: &Path) -> Result<Vec<(f32, f32)>> {
    let bytes = fs::read(path).map_err(|source| Error::io(path, source))?;
    if bytes.len() % 8 != 0 {
        return Err(Error::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("header length {} is not a multiple of 8 bytes", bytes.len()),
            ),
        ));
    }

    let mut pairs = Vec::with_capacity(bytes.len() / 8);
    for chunk in bytes.chunks_exact(8) {
        let freq = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let count = f32::from_ne_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        pairs.push((freq, count));
    }
    Ok(pairs)
}
