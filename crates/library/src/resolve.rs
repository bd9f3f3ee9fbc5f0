//! Content identifier → filesystem path resolution.
//!
//! Two identifier forms are understood:
//!
//! - a literal filesystem path, used as-is when it exists, and
//! - a media-source URI (`media-source://media_source/local/<relative>`, the
//!   `local/` segment being optional) whose relative part is looked up under
//!   the default root first, then under each configured media root in order.

use std::iter;
use std::path::{Component, Path, PathBuf};

pub const MEDIA_SOURCE_PREFIX: &str = "media-source://media_source/";
/// Root every media-source URI is tried against before the configured roots.
pub const DEFAULT_ROOT: &str = "/media";

#[derive(Clone, Debug)]
pub struct PathResolver {
    default_root: PathBuf,
    roots: Vec<PathBuf>,
}
impl PathResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { default_root: PathBuf::from(DEFAULT_ROOT), roots }
    }

    /// Replace the fixed `/media` root (mostly useful for tests).
    pub fn with_default_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.default_root = root.into();
        self
    }

    /// Returns an existing path for `identifier`, or `None` when nothing
    /// matches. Not finding anything is normal and is not an error.
    pub async fn resolve(&self, identifier: &str) -> Option<PathBuf> {
        if identifier.is_empty() {
            return None;
        }
        let literal = Path::new(identifier);
        if exists(literal).await {
            return Some(literal.to_path_buf());
        }
        let relative = identifier.strip_prefix(MEDIA_SOURCE_PREFIX)?;
        let relative = relative.strip_prefix("local/").unwrap_or(relative);
        let Some(relative) = normalize(relative) else {
            tracing::debug!(identifier, "Refusing to resolve media-source path outside of its root");
            return None;
        };
        for root in iter::once(&self.default_root).chain(&self.roots) {
            let candidate = root.join(&relative);
            if exists(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Collapses `.` and `..` so the result can be safely joined onto a root.
/// Returns `None` for anything that would leave the root, is empty, or
/// contains a null byte.
fn normalize(relative: &str) -> Option<PathBuf> {
    let mut components = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    return None;
                }
                components.push(s)
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => return None,
            Component::ParentDir => {
                components.pop()?;
            },
        }
    }
    match components.is_empty() {
        true => None,
        false => Some(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Fixture {
        default_root: tempfile::TempDir,
        alt: tempfile::TempDir,
        resolver: PathResolver,
    }

    fn fixture() -> Fixture {
        let default_root = tempfile::tempdir().unwrap();
        let alt = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(vec![alt.path().to_path_buf()]).with_default_root(default_root.path());
        Fixture { default_root, alt, resolver }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"data").unwrap();
    }

    #[tokio::test]
    async fn test_literal_path_returned_unchanged() {
        let f = fixture();
        let file = f.alt.path().join("cam/clip.mp4");
        touch(&file);
        let identifier = file.to_str().unwrap();
        assert_eq!(f.resolver.resolve(identifier).await, Some(file.clone()));
    }

    #[tokio::test]
    async fn test_missing_literal_path() {
        let f = fixture();
        let file = f.alt.path().join("cam/clip.mp4");
        assert_eq!(f.resolver.resolve(file.to_str().unwrap()).await, None);
        assert_eq!(f.resolver.resolve("").await, None);
    }

    #[tokio::test]
    async fn test_default_root_wins() {
        let f = fixture();
        touch(&f.default_root.path().join("cam/clip.mp4"));
        touch(&f.alt.path().join("cam/clip.mp4"));
        let resolved = f.resolver.resolve("media-source://media_source/local/cam/clip.mp4").await;
        assert_eq!(resolved, Some(f.default_root.path().join("cam/clip.mp4")));
    }

    #[tokio::test]
    async fn test_falls_back_to_configured_roots() {
        let f = fixture();
        touch(&f.alt.path().join("cam/clip.mp4"));
        let resolved = f.resolver.resolve("media-source://media_source/cam/clip.mp4").await;
        assert_eq!(resolved, Some(f.alt.path().join("cam/clip.mp4")));
    }

    #[tokio::test]
    async fn test_exists_only_under_default_root() {
        let f = fixture();
        touch(&f.default_root.path().join("only/here.mp4"));
        let resolved = f.resolver.resolve("media-source://media_source/local/only/here.mp4").await;
        assert_eq!(resolved, Some(f.default_root.path().join("only/here.mp4")));
        // Configured roots don't make a missing file appear.
        assert_eq!(f.resolver.resolve("media-source://media_source/local/nowhere.mp4").await, None);
    }

    #[tokio::test]
    async fn test_configured_order_is_respected() {
        let default_root = tempfile::tempdir().unwrap();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("clip.mp4"));
        touch(&second.path().join("clip.mp4"));
        let resolver = PathResolver::new(vec![second.path().to_path_buf(), first.path().to_path_buf()])
            .with_default_root(default_root.path());
        let resolved = resolver.resolve("media-source://media_source/local/clip.mp4").await;
        assert_eq!(resolved, Some(second.path().join("clip.mp4")));
    }

    #[tokio::test]
    async fn test_traversal_is_not_resolved() {
        let f = fixture();
        touch(&f.default_root.path().join("secret.mp4"));
        // Would only exist by escaping `alt`.
        let escape = format!("media-source://media_source/local/../{}/secret.mp4", f.default_root.path().display());
        assert_eq!(f.resolver.resolve(&escape).await, None);
    }

    #[rstest]
    #[case("cam/clip.mp4", Some("cam/clip.mp4"))]
    #[case("./cam//clip.mp4", Some("cam/clip.mp4"))]
    #[case("cam/../clip.mp4", Some("clip.mp4"))]
    #[case("../clip.mp4", None)]
    #[case("cam/../../clip.mp4", None)]
    #[case("/etc/passwd", None)]
    #[case("a\0b", None)]
    #[case("", None)]
    #[case(".", None)]
    fn test_normalize(#[case] relative: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize(relative), expected.map(PathBuf::from));
    }
}
