//! Error types shared across the workspace.
//!
//! Every fallible operation in the iqrec crates returns [`Result`]. All
//! errors are unrecoverable from inside a block: there is no retry and no
//! fallback path. Errors propagate out of `work` to the host runtime,
//! which is responsible for stopping the graph.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for results using the workspace error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for the capture core.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value parsed correctly but is semantically invalid:
    /// an unknown sample-type code, a non-positive rate or batch size, an
    /// empty tag key, a dwell that spans no samples.
    ///
    /// Raised at construction, before any I/O happens. The message names
    /// the offending field or value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A file or directory operation failed (open, write, create-dir).
    ///
    /// The message always names the offending path. Partial writes are
    /// not retried.
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sweep-mode capture started with no way to attribute samples to a
    /// center frequency: the first sample of the first batch carries no
    /// frequency tag and no initial tag value was configured.
    #[error("Undefined tag state: {0}")]
    UndefinedTagState(String),

    /// A stream tag carried a payload that could not be read as a number.
    #[error("Tag value error: {0}")]
    TagValue(String),
}

impl Error {
    /// Wrap an I/O failure together with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
