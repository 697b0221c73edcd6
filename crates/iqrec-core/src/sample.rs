//! Sample-type codes for IQ streams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fixed-width complex sample formats, named by their short type codes.
///
/// The code doubles as the file extension of captured data files. Payload
/// bytes are stored in host byte order; re/im ordering and signedness are
/// the code's convention and are never reinterpreted by the blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Complex float32: 8 bytes per item (re, im).
    Fc32,
    /// Complex float64: 16 bytes per item.
    Fc64,
    /// Complex signed 16-bit: 4 bytes per item.
    Sc16,
    /// Complex signed 8-bit: 2 bytes per item.
    Sc8,
}

impl SampleFormat {
    /// Size of one stream item in bytes.
    pub fn item_size(&self) -> usize {
        match self {
            SampleFormat::Fc32 => 8,
            SampleFormat::Fc64 => 16,
            SampleFormat::Sc16 => 4,
            SampleFormat::Sc8 => 2,
        }
    }

    /// The short type code, also used as the data-file extension.
    pub fn code(&self) -> &'static str {
        match self {
            SampleFormat::Fc32 => "fc32",
            SampleFormat::Fc64 => "fc64",
            SampleFormat::Sc16 => "sc16",
            SampleFormat::Sc8 => "sc8",
        }
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fc32" => Ok(SampleFormat::Fc32),
            "fc64" => Ok(SampleFormat::Fc64),
            "sc16" => Ok(SampleFormat::Sc16),
            "sc8" => Ok(SampleFormat::Sc8),
            other => Err(Error::Configuration(format!(
                "unsupported input type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
