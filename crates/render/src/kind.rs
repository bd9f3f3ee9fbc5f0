use std::path::Path;

/// Extensions (lowercase, without the dot) rendered from a frame offset.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v", "ts"];
/// Extensions (lowercase, without the dot) rendered by a direct resize.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// What kind of source a thumbnail is rendered from. Decides which arguments
/// get passed to the tool and how long it is allowed to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Image,
}
impl MediaKind {
    /// Classifies a path by its (case-insensitive) extension. Anything not
    /// recognized is `None` and should be skipped.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        if VIDEO_EXTENSIONS.contains(&ext) {
            Some(Self::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else {
            None
        }
    }
}
