//! Core error types for claude-plugin-core
//!
//! Every fallible operation on the plugin registry, the marketplace registry
//! and the settings documents reports one of these.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, validating or rewriting Claude Code's
/// plugin configuration files.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A file the operation depends on does not exist.
    #[error("file not found: {path:?}")]
    MissingFile { path: PathBuf },

    /// A JSON document could not be parsed.
    #[error("invalid JSON in {path:?}: {source}")]
    MalformedJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A JSON document parsed, but not into the shape we edit.
    ///
    /// Raised when the top level is not an object, or when a well-known key
    /// such as `plugins` or `enabledPlugins` holds something other than the
    /// expected container.
    #[error("unexpected structure in {path:?}: {detail}")]
    UnexpectedShape { path: PathBuf, detail: String },

    /// The requested marketplace is not registered.
    #[error("marketplace '{0}' not found in known_marketplaces.json")]
    UnknownMarketplace(String),

    /// A `plugin@marketplace` argument could not be split.
    #[error("invalid plugin '{0}': expected plugin@marketplace")]
    InvalidPluginSpec(String),

    /// Underlying filesystem failure with the operation that caused it.
    #[error("I/O error during '{operation}' on {path:?}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// A freshly written backup does not hash to the same digest as its source.
    #[error("backup {backup:?} does not match {original:?}: expected {expected}, got {actual}")]
    BackupMismatch {
        original: PathBuf,
        backup: PathBuf,
        expected: String,
        actual: String,
    },
}

impl CoreError {
    pub fn io<P: Into<PathBuf>>(operation: &'static str, path: P, source: io::Error) -> Self {
        CoreError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn shape<P: Into<PathBuf>>(path: P, detail: impl Into<String>) -> Self {
        CoreError::UnexpectedShape {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
