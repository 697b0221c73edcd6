//! Stream tags: out-of-band annotations pinned to absolute offsets.

use crate::value::Value;

/// An annotation attached to a specific absolute sample offset on a
/// stream.
///
/// Offsets are positions in the whole stream, not positions within a work
/// call. Tags are how a capture sink learns the receiver's center
/// frequency: a retuned receiver stamps its output at the offset where the
/// retune took effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Absolute position in the stream.
    pub offset: u64,
    /// Symbolic key, e.g. `"rx_freq"`.
    pub key: String,
    /// Typed payload.
    pub value: Value,
    /// Identifier of the block that emitted the tag.
    pub source: String,
}

impl Tag {
    pub fn new(
        offset: u64,
        key: impl Into<String>,
        value: Value,
        source: impl Into<String>,
    ) -> Self {
        Self {
            offset,
            key: key.into(),
            value,
            source: source.into(),
        }
    }
}
