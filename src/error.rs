//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias defaulting to [`CocapError`].
pub type Result<T, E = CocapError> = std::result::Result<T, E>;

/// Failures surfaced by vocabulary construction, corpus loading, and batch
/// sampling.
#[derive(Debug, Error)]
pub enum CocapError {
    /// A configuration value failed validation before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The corpus was readable but unusable, e.g. no caption files were
    /// discovered or every file parsed to zero captions.
    #[error("corpus error: {0}")]
    Corpus(String),
    /// IO failure, tagged with the offending path when one is known.
    #[error("io error for {path:?}: {source}")]
    Io {
        /// The error reported by the standard library.
        source: std::io::Error,
        /// Path being read or written when the failure occurred.
        path: Option<PathBuf>,
    },
    /// Failure raised by the `tokenizers` crate during export or reload.
    #[error("huggingface tokenizers error: {0}")]
    Tokenizers(String),
    /// A vocabulary file or annotation payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Invariant violations that should not be reachable from the public API.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokenizers::Error> for CocapError {
    fn from(err: tokenizers::Error) -> Self {
        Self::Tokenizers(err.to_string())
    }
}

impl From<serde_json::Error> for CocapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl CocapError {
    /// Wraps an IO error together with the path that produced it.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
