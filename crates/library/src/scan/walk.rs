use async_stream::stream;
use futures::Stream;
use lookout_render::MediaKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Something the walk turned up.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Found {
    Media(PathBuf, MediaKind),
    /// One of our own cache directories. Reported but not entered.
    CacheFolder(PathBuf),
}

enum WalkEntry {
    Found(Found),
    Descend(PathBuf),
    Skip,
}

/// Depth-first walk yielding every supported media file under `root`.
///
/// Directories named `folder` (our own cache directories) are reported but
/// never entered. Symlinked files are followed, symlinked directories are not.
/// Unreadable directories and entries are logged and skipped.
pub(crate) fn media_files(root: PathBuf, folder: String) -> impl Stream<Item = Found> {
    stream! {
        if in_cache_folder(&root, &folder) {
            tracing::debug!(root = %root.display(), "Not scanning inside a thumbnail folder");
            return;
        }
        let mut stack = vec![root];
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %current.display(), error = %e, "Skipping unreadable directory");
                    continue 'dirs;
                },
            };
            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(e) => {
                        tracing::warn!(path = %current.display(), error = %e, "Stopped reading directory early");
                        break 'entries;
                    },
                };
                match process_entry(entry, &folder).await {
                    WalkEntry::Found(found) => yield found,
                    WalkEntry::Descend(dir) => stack.push(dir),
                    WalkEntry::Skip => {},
                }
            }
        }
    }
}

async fn process_entry(entry: DirEntry, folder: &str) -> WalkEntry {
    let path = entry.path();
    let file_type = match entry.file_type().await {
        Ok(file_type) => file_type,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
            return WalkEntry::Skip;
        },
    };
    if file_type.is_dir() {
        return match entry.file_name() == folder {
            true => WalkEntry::Found(Found::CacheFolder(path)),
            false => WalkEntry::Descend(path),
        };
    }
    let is_file = match file_type.is_symlink() {
        // Broken links and links to directories are both dropped.
        true => fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false),
        false => file_type.is_file(),
    };
    if !is_file {
        return WalkEntry::Skip;
    }
    match MediaKind::from_path(&path) {
        Some(kind) => WalkEntry::Found(Found::Media(path, kind)),
        None => {
            tracing::debug!(path = %path.display(), "Skipping unsupported file type");
            WalkEntry::Skip
        },
    }
}

fn in_cache_folder(path: &Path, folder: &str) -> bool {
    path.components().any(|c| c.as_os_str() == folder)
}
