//! Configuration loading and validation.
//!
//! Configuration is loaded once into a [`RawConfig`] (defaults, then a file,
//! then `LOOKOUT_*` environment variables) and validated into a [`Config`].
//! A [`Config`] is immutable: reconfiguring means validating a new one and
//! building a new engine from it.

pub mod error;
mod raw;

pub use crate::raw::{
    DEFAULT_FRAME_POSITION, DEFAULT_STARTUP_DELAY_SECS, DEFAULT_THUMBNAIL_FOLDER, DEFAULT_THUMBNAIL_HEIGHT,
    DEFAULT_THUMBNAIL_QUALITY, DEFAULT_THUMBNAIL_WIDTH, ENV_PREFIX, RawConfig,
};
use directories::ProjectDirs;
use lookout_render::RenderParams;
use std::path::PathBuf;
use std::time::Duration;

/// Validated configuration. Only obtainable through [`RawConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Config {
    /// Existing, absolute directories in the order they were configured.
    pub media_paths: Vec<PathBuf>,
    pub render: RenderParams,
    /// Name of the cache directory created next to each media file.
    pub thumbnail_folder: String,
    pub auto_generate: bool,
    pub startup_delay: Duration,
    pub scan_concurrency: usize,
    /// Explicit ffmpeg binary; discovered on `PATH` when `None`.
    pub ffmpeg_path: Option<PathBuf>,
}

/// `<config dir>/config.toml`, e.g. `~/.config/lookout/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lookout").map(|dirs| dirs.config_dir().join("config.toml"))
}
