//! Why a render didn't produce a thumbnail.
//!
//! None of these ever escape [`Renderer::render`](crate::Renderer::render);
//! they exist so that [`Renderer::try_render`](crate::Renderer::try_render)
//! callers (and the logs) can tell *why* a thumbnail is missing.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The external tool could not be found or refused to run. Permanent for
    /// the lifetime of the [`Renderer`](crate::Renderer).
    #[display("frame extraction tool not available on this system")]
    ToolUnavailable,
    /// The external tool did not finish within its wall-clock budget.
    #[display("frame extraction timed out after {}ms", _0.as_millis())]
    ToolTimeout(#[error(not(source))] Duration),
    /// The tool exited with a non-zero exit code. `None` means it was killed
    /// by a signal.
    #[display("frame extraction tool exited with code: {}", exit_code(_0))]
    ToolFailed(#[error(not(source))] Option<i32>),
    /// The tool reported success but never wrote the output file.
    #[display("no output written to {}", _0.display())]
    MissingOutput(#[error(not(source))] PathBuf),
    #[display("I/O error")]
    Io,
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ToolTimeout(_) | Self::Io)
    }
}
