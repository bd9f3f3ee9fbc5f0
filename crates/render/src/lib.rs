//! Thumbnail rendering through an external frame-extraction tool.
//!
//! A [`Renderer`] wraps a [`FrameTool`] (normally [`Ffmpeg`]) and adds the
//! parts every caller needs: a one-time availability probe, per-kind
//! timeouts, destination directory creation and atomic replacement of the
//! output file. Expected failures (tool missing, non-zero exit, timeout) are
//! logged and reported as `false`; they never panic or propagate.

pub mod error;
mod kind;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod params;
mod tool;

pub use crate::kind::{IMAGE_EXTENSIONS, MediaKind, VIDEO_EXTENSIONS};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{MockBehaviour, MockTool};
pub use crate::params::{RenderJob, RenderParams, Timeouts};
pub use crate::tool::{Ffmpeg, FrameTool};
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Ends every staging file name. The tool picks its output format from the
/// extension, so it has to end in ".jpg"; thumbnails themselves always end in
/// `_<8 hex digits>.jpg`, which can never match.
const STAGING_SUFFIX: &str = ".tmp.jpg";

fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// Whether the external tool can be used. Probed lazily, at most once per
/// [`Renderer`], and never re-probed.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ToolAvailability {
    #[display("unknown")]
    Unknown,
    #[display("available")]
    Available,
    #[display("unavailable")]
    Unavailable,
}

pub struct Renderer {
    tool: Arc<dyn FrameTool>,
    params: RenderParams,
    timeouts: Timeouts,
    available: OnceCell<bool>,
}

pub struct RendererBuilder {
    tool: Arc<dyn FrameTool>,
    params: RenderParams,
    timeouts: Timeouts,
}
impl RendererBuilder {
    pub fn params(mut self, params: RenderParams) -> Self {
        self.params = params;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> Renderer {
        Renderer {
            tool: self.tool,
            params: self.params,
            timeouts: self.timeouts,
            available: OnceCell::new(),
        }
    }
}

impl Renderer {
    pub fn builder(tool: Arc<dyn FrameTool>) -> RendererBuilder {
        RendererBuilder {
            tool,
            params: RenderParams::default(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    /// Probes the tool on first call and returns the cached answer on every
    /// call after that. Concurrent first callers share a single probe.
    pub async fn probe(&self) -> bool {
        let available = self
            .available
            .get_or_init(|| async {
                // Dropping the probe on timeout kills the child, same as a render.
                let available = match tokio::time::timeout(self.timeouts.probe, self.tool.probe()).await {
                    Ok(available) => available,
                    Err(_elapsed) => {
                        tracing::warn!(tool = self.tool.name(), timeout = ?self.timeouts.probe, "Probe timed out");
                        false
                    },
                };
                if available {
                    tracing::info!(tool = self.tool.name(), "Frame extraction tool found; thumbnail generation enabled");
                } else {
                    tracing::warn!(tool = self.tool.name(), "Frame extraction tool not found; thumbnail generation disabled");
                }
                available
            })
            .await;
        *available
    }

    /// Removes staging files in `dir` left behind by renders that never
    /// finished (the process was killed mid-render, say). Only files older
    /// than twice the longest render budget are removed, so renders still in
    /// progress keep theirs. Returns how many were removed.
    pub async fn sweep_staging(&self, dir: &Path) -> usize {
        let cutoff = self.timeouts.video.max(self.timeouts.image) * 2;
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return 0;
        };
        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if !entry.file_name().to_str().is_some_and(is_staging_name) {
                continue;
            }
            let age = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified.elapsed().unwrap_or_default(),
                Err(_) => continue,
            };
            if age < cutoff {
                continue;
            }
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Removed abandoned staging file");
                    removed += 1;
                },
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not remove staging file"),
            }
        }
        removed
    }

    /// Current probe state, without probing.
    pub fn availability(&self) -> ToolAvailability {
        match self.available.get() {
            None => ToolAvailability::Unknown,
            Some(true) => ToolAvailability::Available,
            Some(false) => ToolAvailability::Unavailable,
        }
    }

    pub async fn render_video(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> bool {
        self.render(MediaKind::Video, source, dest).await
    }

    pub async fn render_image(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> bool {
        self.render(MediaKind::Image, source, dest).await
    }

    /// Renders a thumbnail of `source` to `dest`, returning whether it worked.
    /// Failures are logged, never returned.
    pub async fn render(&self, kind: MediaKind, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> bool {
        let source = source.as_ref();
        match self.try_render(kind, source, dest.as_ref()).await {
            Ok(()) => {
                tracing::debug!(source = %source.display(), "Generated thumbnail");
                true
            },
            Err(e) => {
                let reason: &ErrorKind = &e;
                match reason {
                    // Already announced (once) by the probe.
                    ErrorKind::ToolUnavailable => {},
                    ErrorKind::ToolTimeout(_) => {
                        tracing::warn!(source = %source.display(), "Thumbnail generation timed out")
                    },
                    _ => tracing::warn!(source = %source.display(), error = %reason, "Thumbnail generation failed"),
                }
                false
            },
        }
    }

    /// Fallible version of [`render`](Self::render).
    ///
    /// The tool writes into a temporary file next to `dest` which is renamed
    /// over `dest` only once the tool has succeeded; a failed or timed-out
    /// render leaves any previous `dest` untouched and no partial file behind.
    #[instrument(skip_all, fields(source = %source.display(), kind = ?kind))]
    pub async fn try_render(&self, kind: MediaKind, source: &Path, dest: &Path) -> Result<()> {
        if !self.probe().await {
            exn::bail!(ErrorKind::ToolUnavailable);
        }
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(dir).await.or_raise(|| ErrorKind::Io)?;
        let stem = dest.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let prefix = format!(".{stem}.");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(STAGING_SUFFIX);
        // Thumbnails are served by other processes; tempfile's default is 0600.
        // The umask still applies on top of this.
        #[cfg(unix)]
        builder.permissions(<std::fs::Permissions as std::os::unix::fs::PermissionsExt>::from_mode(0o644));
        let staging = builder.tempfile_in(dir).or_raise(|| ErrorKind::Io)?.into_temp_path();

        let job = RenderJob {
            kind,
            source: source.to_path_buf(),
            output: staging.to_path_buf(),
            params: self.params.clone(),
        };
        let budget = self.timeouts.for_kind(kind);
        // Dropping the render future on timeout kills the child process.
        match tokio::time::timeout(budget, self.tool.render_frame(&job)).await {
            Ok(result) => result?,
            Err(_elapsed) => exn::bail!(ErrorKind::ToolTimeout(budget)),
        }

        // The staging file exists from the moment it was reserved; empty means
        // the tool never wrote to it.
        let written = tokio::fs::metadata(&staging).await.map(|m| m.len() > 0).unwrap_or(false);
        if !written {
            exn::bail!(ErrorKind::MissingOutput(dest.to_path_buf()));
        }
        staging.persist(dest).or_raise(|| ErrorKind::Io)?;
        Ok(())
    }
}
