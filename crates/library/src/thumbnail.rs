use crate::flight::KeyedLocks;
use crate::keying::{cache_path_for, is_fresh};
use lookout_render::{MediaKind, Renderer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What [`Thumbnailer::ensure`] did for one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The cache entry was already up to date.
    Fresh(PathBuf),
    Generated(PathBuf),
    Failed,
}
impl Outcome {
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Fresh(path) | Self::Generated(path) => Some(path),
            Self::Failed => None,
        }
    }
}

/// Cache keying, freshness and rendering for a single source file, shared by
/// identifier lookups and bulk scans.
pub(crate) struct Thumbnailer {
    renderer: Arc<Renderer>,
    folder: String,
    locks: KeyedLocks,
}
impl Thumbnailer {
    pub(crate) fn new(renderer: Arc<Renderer>, folder: impl Into<String>) -> Self {
        Self { renderer, folder: folder.into(), locks: KeyedLocks::new() }
    }

    pub(crate) fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    pub(crate) fn folder(&self) -> &str {
        &self.folder
    }

    /// Makes sure an up-to-date thumbnail of `source` exists.
    ///
    /// Overlapping calls for the same file take turns: whoever comes second
    /// finds the first one's output fresh and doesn't render again.
    pub(crate) async fn ensure(&self, source: &Path, kind: MediaKind) -> Outcome {
        let cache = cache_path_for(source, &self.folder);
        if is_fresh(&cache, source).await {
            return Outcome::Fresh(cache);
        }
        let _guard = self.locks.lock(&cache).await;
        if is_fresh(&cache, source).await {
            return Outcome::Fresh(cache);
        }
        match self.renderer.render(kind, source, &cache).await {
            true => Outcome::Generated(cache),
            false => Outcome::Failed,
        }
    }
}
