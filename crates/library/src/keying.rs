//! Where a thumbnail lives, and whether it's still good.

use std::path::{Path, PathBuf};

/// Extension of every generated thumbnail.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Cache location for `source`: `<parent>/<folder>/<stem>_<digest>.jpg`.
///
/// The digest is the first 8 hex characters of the MD5 of the full absolute
/// source path, so same-named files in different directories never share a
/// thumbnail, and `./clip.mp4` keys the same as `/media/cam/clip.mp4` when run
/// from `/media/cam`. Relative paths are made absolute against the current
/// directory, without touching the filesystem.
pub fn cache_path_for(source: &Path, folder: &str) -> PathBuf {
    let source = std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf());
    let digest = format!("{:x}", md5::compute(source.to_string_lossy().as_bytes()));
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let dir = source.parent().unwrap_or_else(|| Path::new("")).join(folder);
    dir.join(format!("{stem}_{}.{THUMBNAIL_EXTENSION}", &digest[..8]))
}

/// `true` only if `cache` exists and was modified no earlier than `source`.
/// Anything unreadable counts as stale.
pub async fn is_fresh(cache: &Path, source: &Path) -> bool {
    let (cache, source) = tokio::join!(tokio::fs::metadata(cache), tokio::fs::metadata(source));
    let (Ok(cache), Ok(source)) = (cache, source) else {
        return false;
    };
    if !cache.is_file() {
        return false;
    }
    match (cache.modified(), source.modified()) {
        (Ok(cache), Ok(source)) => cache >= source,
        _ => false,
    }
}
