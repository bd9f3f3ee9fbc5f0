use crate::Config;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 320;
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 180;
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 70;
pub const DEFAULT_FRAME_POSITION: f64 = 0.5;
pub const DEFAULT_THUMBNAIL_FOLDER: &str = ".thumbnails";
pub const DEFAULT_STARTUP_DELAY_SECS: u64 = 60;
/// Environment variables with this prefix override file values.
pub const ENV_PREFIX: &str = "LOOKOUT_";

/// Configuration exactly as the user wrote it; nothing has been checked yet.
///
/// Every field has a default, so an empty file (or no file at all) is a valid
/// starting point. Turn it into a usable [`Config`] with
/// [`validate()`](Self::validate).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Either a list, or a single comma-separated string.
    #[serde(deserialize_with = "path_list")]
    pub media_paths: Vec<PathBuf>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnail_quality: u8,
    pub frame_position: f64,
    pub thumbnail_folder: String,
    pub auto_generate: bool,
    /// Seconds to wait after start-up before the automatic full scan.
    pub startup_delay: u64,
    pub scan_concurrency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
}
impl Default for RawConfig {
    fn default() -> Self {
        Self {
            media_paths: vec![PathBuf::from("/media")],
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            thumbnail_height: DEFAULT_THUMBNAIL_HEIGHT,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
            frame_position: DEFAULT_FRAME_POSITION,
            thumbnail_folder: DEFAULT_THUMBNAIL_FOLDER.to_string(),
            auto_generate: true,
            startup_delay: DEFAULT_STARTUP_DELAY_SECS,
            scan_concurrency: 1,
            ffmpeg_path: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathList {
    Joined(String),
    List(Vec<PathBuf>),
}

fn path_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error> {
    Ok(match PathList::deserialize(deserializer)? {
        PathList::Joined(joined) => {
            joined.split(',').map(str::trim).filter(|p| !p.is_empty()).map(PathBuf::from).collect()
        },
        PathList::List(list) => list,
    })
}

impl RawConfig {
    /// Layers, lowest priority first: built-in defaults, the configuration
    /// file (format chosen by extension) and `LOOKOUT_*` environment variables.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads from `file` if given (which must then exist), otherwise from the
    /// per-user default location if there is a file there.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(file) if !file.is_file() => exn::bail!(ErrorKind::NotFound(file.to_path_buf())),
            Some(file) => Some(file.to_path_buf()),
            None => crate::default_config_file().filter(|f| f.is_file()),
        };
        if let Some(file) = &file {
            tracing::debug!(file = %file.display(), "Loading configuration file");
        }
        Self::figment(file.as_deref()).extract().or_raise(|| ErrorKind::Load)
    }

    /// Checks ranges and media paths, producing an immutable [`Config`].
    ///
    /// Media paths that aren't existing directories are dropped (with a
    /// warning); it is only an error when none survive.
    pub fn validate(self) -> Result<Config> {
        check_range("thumbnail_width", self.thumbnail_width, 80, 640)?;
        check_range("thumbnail_height", self.thumbnail_height, 45, 360)?;
        check_range("thumbnail_quality", self.thumbnail_quality, 10, 100)?;
        // NaN fails both comparisons, so it's rejected here too.
        if !(0.0..=10.0).contains(&self.frame_position) {
            exn::bail!(ErrorKind::out_of_range("frame_position", 0.0, 10.0, self.frame_position));
        }
        if !is_plain_folder_name(&self.thumbnail_folder) {
            exn::bail!(ErrorKind::InvalidFolder(self.thumbnail_folder));
        }
        if self.scan_concurrency == 0 {
            exn::bail!(ErrorKind::InvalidConcurrency);
        }

        let media_paths = valid_media_paths(self.media_paths);
        if media_paths.is_empty() {
            exn::bail!(ErrorKind::NoValidMediaPaths);
        }

        Ok(Config {
            media_paths,
            render: lookout_render::RenderParams {
                width: self.thumbnail_width,
                height: self.thumbnail_height,
                quality: self.thumbnail_quality,
                frame_position: self.frame_position,
            },
            thumbnail_folder: self.thumbnail_folder,
            auto_generate: self.auto_generate,
            startup_delay: std::time::Duration::from_secs(self.startup_delay),
            scan_concurrency: self.scan_concurrency,
            ffmpeg_path: self.ffmpeg_path,
        })
    }
}

fn check_range<T: PartialOrd + ToString>(field: &'static str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        exn::bail!(ErrorKind::out_of_range(field, min, max, value));
    }
    Ok(())
}

fn is_plain_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
        && !name.contains(['/', '\\'])
}

fn valid_media_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut valid: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if path.as_os_str().is_empty() {
            continue;
        }
        if !path.is_dir() {
            tracing::warn!(path = %path.display(), "Ignoring media path; not an existing directory");
            continue;
        }
        let path = std::path::absolute(&path).unwrap_or(path);
        if !valid.contains(&path) {
            valid.push(path);
        }
    }
    valid
}
