//! Whole-buffer binary writes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use iqrec_core::{Error, Result};

/// Write the whole byte buffer, surfacing any failure as fatal.
pub(crate) fn write_bytes(file: &mut File, buf: &[u8], path: &Path) -> Result<()> {
    file.write_all(buf).map_err(|source| Error::io(path, source))
}

/// Write `values` as host-byte-order IEEE-754 single-precision floats.
pub(crate) fn write_f32s(file: &mut File, values: &[f32], path: &Path) -> Result<()> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_ne_bytes());
    }
    write_bytes(file, &bytes, path)
}
