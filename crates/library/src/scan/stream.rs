use crate::scan::GenerationStats;
use crate::scan::walk::{Found, media_files};
use crate::thumbnail::{Outcome, Thumbnailer};
use async_stream::stream;
use futures::{Stream, StreamExt};
use std::path::PathBuf;

/// Result for a single media file during a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    /// Already had a fresh thumbnail.
    Skipped,
    Generated,
    Failed,
}
impl From<&Outcome> for FileOutcome {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Fresh(_) => Self::Skipped,
            Outcome::Generated(_) => Self::Generated,
            Outcome::Failed => Self::Failed,
        }
    }
}

/// Progress events emitted by a scan.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. For each root, either [`RootMissing`](Self::RootMissing), or
///    [`Root`](Self::Root) followed by zero or more [`File`](Self::File).
/// 3. [`Complete`](Self::Complete), exactly once, with the final counters.
///
/// Nothing that happens to an individual file ends the stream early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanEvent {
    Started,
    /// About to walk this root.
    Root(PathBuf),
    /// The root is missing or isn't a directory, and was skipped.
    RootMissing(PathBuf),
    File { path: PathBuf, outcome: FileOutcome },
    Complete(GenerationStats),
}

/// Streams [`ScanEvent`]s while making sure every supported media file under
/// `roots` has a fresh thumbnail.
///
/// Up to `concurrency` files are processed at a time; with `1` files are
/// handled strictly one after another in walk order.
pub(crate) fn scan<'a>(
    thumbnailer: &'a Thumbnailer,
    roots: Vec<PathBuf>,
    concurrency: usize,
) -> impl Stream<Item = ScanEvent> + 'a {
    let concurrency = concurrency.max(1);
    stream!({
        yield ScanEvent::Started;
        let mut stats = GenerationStats::default();

        for root in roots {
            let is_dir = tokio::fs::metadata(&root).await.map(|m| m.is_dir()).unwrap_or(false);
            if !is_dir {
                tracing::warn!(root = %root.display(), "Media path is missing or not a directory; skipping");
                yield ScanEvent::RootMissing(root);
                continue;
            }
            tracing::debug!(root = %root.display(), "Scanning media path");
            yield ScanEvent::Root(root.clone());

            let files = media_files(root, thumbnailer.folder().to_string())
                .map(move |found| async move {
                    match found {
                        Found::Media(path, kind) => {
                            let outcome = thumbnailer.ensure(&path, kind).await;
                            // Let lookups and other tasks in between files.
                            tokio::task::yield_now().await;
                            Some((path, FileOutcome::from(&outcome)))
                        },
                        Found::CacheFolder(dir) => {
                            thumbnailer.renderer().sweep_staging(&dir).await;
                            None
                        },
                    }
                })
                .buffer_unordered(concurrency);
            for await file in files {
                let Some((path, outcome)) = file else {
                    continue;
                };
                stats.record(outcome);
                yield ScanEvent::File { path, outcome };
            }
        }

        tracing::info!(
            scanned = stats.scanned,
            generated = stats.generated,
            skipped = stats.skipped,
            failed = stats.failed,
            "Thumbnail generation complete"
        );
        yield ScanEvent::Complete(stats);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_render::{MockBehaviour, MockTool, Renderer};
    use std::path::Path;
    use std::sync::Arc;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"data").unwrap();
    }

    fn thumbnailer(tool: &Arc<MockTool>) -> Thumbnailer {
        Thumbnailer::new(Arc::new(Renderer::builder(tool.clone()).build()), ".thumbnails")
    }

    #[tokio::test]
    async fn test_event_order() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        touch(&dir.path().join("clip.mp4"));
        let tool = Arc::new(MockTool::default());
        let thumbnailer = thumbnailer(&tool);

        let events: Vec<_> = scan(&thumbnailer, vec![missing.clone(), dir.path().to_path_buf()], 1).collect().await;
        let expected_stats = GenerationStats { scanned: 1, generated: 1, skipped: 0, failed: 0 };
        assert_eq!(
            events,
            vec![
                ScanEvent::Started,
                ScanEvent::RootMissing(missing),
                ScanEvent::Root(dir.path().to_path_buf()),
                ScanEvent::File { path: dir.path().join("clip.mp4"), outcome: FileOutcome::Generated },
                ScanEvent::Complete(expected_stats),
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.mp4", "b.png", "c.mov"] {
            touch(&dir.path().join(name));
        }
        let tool = Arc::new(MockTool::new(MockBehaviour::Fail(1)));
        let thumbnailer = thumbnailer(&tool);
        let events: Vec<_> = scan(&thumbnailer, vec![dir.path().to_path_buf()], 1).collect().await;
        assert_eq!(
            events.last(),
            Some(&ScanEvent::Complete(GenerationStats { scanned: 3, generated: 0, skipped: 0, failed: 3 }))
        );
        assert_eq!(tool.render_calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scan_counts_everything() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            touch(&dir.path().join(format!("dir{}/clip{i}.mp4", i % 3)));
        }
        let tool = Arc::new(MockTool::new(MockBehaviour::Hang(std::time::Duration::from_millis(10))));
        let thumbnailer = thumbnailer(&tool);
        let events: Vec<_> = scan(&thumbnailer, vec![dir.path().to_path_buf()], 4).collect().await;
        let files = events.iter().filter(|e| matches!(e, ScanEvent::File { .. })).count();
        assert_eq!(files, 12);
        assert_eq!(
            events.last(),
            Some(&ScanEvent::Complete(GenerationStats { scanned: 12, generated: 12, skipped: 0, failed: 0 }))
        );
    }

    #[tokio::test]
    async fn test_file_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        touch(&file);
        let tool = Arc::new(MockTool::default());
        let thumbnailer = thumbnailer(&tool);
        let events: Vec<_> = scan(&thumbnailer, vec![file.clone()], 1).collect().await;
        assert_eq!(
            events,
            vec![ScanEvent::Started, ScanEvent::RootMissing(file), ScanEvent::Complete(GenerationStats::default())]
        );
        assert_eq!(tool.render_calls(), 0);
    }

    #[tokio::test]
    async fn test_scan_clears_abandoned_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("clip.mp4"));
        let abandoned = dir.path().join(".thumbnails/.clip_352b2d8a.Qw3rTy.tmp.jpg");
        touch(&abandoned);
        let long_ago = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        crate::keying::tests::set_mtime(&abandoned, long_ago);
        let tool = Arc::new(MockTool::default());
        let thumbnailer = thumbnailer(&tool);

        let events: Vec<_> = scan(&thumbnailer, vec![dir.path().to_path_buf()], 2).collect().await;
        assert_eq!(
            events.last(),
            Some(&ScanEvent::Complete(GenerationStats { scanned: 1, generated: 1, skipped: 0, failed: 0 }))
        );
        assert!(!abandoned.exists());
        let left: Vec<_> = std::fs::read_dir(dir.path().join(".thumbnails")).unwrap().collect();
        assert_eq!(left.len(), 1);
    }
}
