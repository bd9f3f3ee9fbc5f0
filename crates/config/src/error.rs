//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Every variant is meant to be shown to
//! whoever is configuring the system, so messages name the offending key.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What's wrong with the configuration, phrased for whoever wrote it.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration sources could not be parsed or merged.
    #[display("unable to load configuration")]
    Load,
    /// None of the configured `media_paths` is an existing directory.
    #[display("no valid media paths configured")]
    NoValidMediaPaths,
    #[display("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
        value: String,
    },
    /// `thumbnail_folder` must be a single, plain directory name.
    #[display("invalid thumbnail folder name: {_0:?}")]
    InvalidFolder(#[error(not(source))] String),
    #[display("scan_concurrency must be at least 1")]
    InvalidConcurrency,
}

impl ErrorKind {
    pub(crate) fn out_of_range<T: ToString>(field: &'static str, min: T, max: T, value: T) -> Self {
        Self::OutOfRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
