use crate::keying::is_fresh;
use crate::lookup::Memo;
use crate::resolve::PathResolver;
use crate::scan::{self, GenerationStats, ScanEvent};
use crate::thumbnail::Thumbnailer;
use futures::{Stream, StreamExt};
use lookout_config::Config;
use lookout_render::{Ffmpeg, MediaKind, Renderer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::instrument;

/// Snapshot of the engine's configuration and tool state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Status {
    pub ffmpeg_available: bool,
    pub media_paths: Vec<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub thumbnail_folder: String,
    /// Identifiers currently remembered by [`Engine::get_thumbnail`].
    pub memoized: usize,
}

/// Everything needed to serve thumbnails for one configuration.
///
/// All state (resolved lookups, tool availability, in-flight renders) lives
/// here; reconfiguring means dropping the engine and building a new one.
pub struct Engine {
    config: Config,
    resolver: PathResolver,
    thumbnailer: Thumbnailer,
    memo: Memo,
}

impl Engine {
    /// An engine rendering with ffmpeg, either the configured binary or the
    /// first one on `PATH`.
    pub fn new(config: Config) -> Self {
        let ffmpeg = match &config.ffmpeg_path {
            Some(program) => Ffmpeg::new(program),
            None => Ffmpeg::discover(),
        };
        let renderer = Renderer::builder(Arc::new(ffmpeg)).params(config.render.clone()).build();
        Self::with_renderer(config, renderer)
    }

    pub fn with_renderer(config: Config, renderer: Renderer) -> Self {
        Self {
            resolver: PathResolver::new(config.media_paths.clone()),
            thumbnailer: Thumbnailer::new(Arc::new(renderer), config.thumbnail_folder.clone()),
            memo: Memo::default(),
            config,
        }
    }

    /// Replace the `/media` root media-source identifiers are tried against
    /// first.
    pub fn with_default_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resolver = self.resolver.with_default_root(root);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        self.thumbnailer.renderer()
    }

    /// Path of an up-to-date thumbnail for `identifier`, generating it if
    /// needed. `None` when the identifier doesn't resolve, isn't a supported
    /// media type, or rendering failed.
    #[instrument(skip(self))]
    pub async fn get_thumbnail(&self, identifier: &str) -> Option<PathBuf> {
        if let Some(memoized) = self.memo.get(identifier).await {
            if is_fresh(&memoized.cache, &memoized.source).await {
                return Some(memoized.cache);
            }
            // Source changed (or the thumbnail went away) since we last looked.
            self.memo.remove(identifier).await;
        }

        let Some(source) = self.resolver.resolve(identifier).await else {
            tracing::debug!("Media not found");
            return None;
        };
        let Some(kind) = MediaKind::from_path(&source) else {
            tracing::debug!(source = %source.display(), "Unsupported media type");
            return None;
        };
        let cache = self.thumbnailer.ensure(&source, kind).await.into_path()?;
        self.memo.insert(identifier, source, cache.clone()).await;
        Some(cache)
    }

    /// Progress stream for a bulk generation over `root`, or over every
    /// configured media path when `None`.
    pub fn scan(&self, root: Option<&Path>) -> impl Stream<Item = ScanEvent> + '_ {
        let roots = match root {
            Some(root) => vec![root.to_path_buf()],
            None => self.config.media_paths.clone(),
        };
        scan::scan(&self.thumbnailer, roots, self.config.scan_concurrency)
    }

    /// Brings every thumbnail under `root` (or every media path) up to date.
    #[instrument(skip(self))]
    pub async fn generate_all(&self, root: Option<&Path>) -> GenerationStats {
        let mut events = std::pin::pin!(self.scan(root));
        let mut stats = GenerationStats::default();
        while let Some(event) = events.next().await {
            if let ScanEvent::Complete(complete) = event {
                stats = complete;
            }
        }
        stats
    }

    /// Forgets every remembered lookup. Thumbnails on disk are left alone.
    pub async fn clear_cache(&self) -> usize {
        let cleared = self.memo.clear().await;
        tracing::info!(cleared, "Cleared thumbnail lookup cache");
        cleared
    }

    /// Probes the tool if that hasn't happened yet.
    pub async fn status(&self) -> Status {
        Status {
            ffmpeg_available: self.renderer().probe().await,
            media_paths: self.config.media_paths.clone(),
            width: self.config.render.width,
            height: self.config.render.height,
            thumbnail_folder: self.config.thumbnail_folder.clone(),
            memoized: self.memo.len().await,
        }
    }

    /// Starts background work: when `auto_generate` is on, a full scan after
    /// the configured start-up delay.
    ///
    /// The scan belongs to the returned handle. Shutting the handle down (or
    /// dropping it) cancels the scan, killing any render in progress.
    pub fn start(self: Arc<Self>) -> EngineHandle {
        let token = CancellationToken::new();
        let task = self.config.auto_generate.then(|| {
            let engine = self.clone();
            let token = token.clone();
            let delay = self.config.startup_delay;
            tracing::info!(delay = ?delay, "Scheduling initial thumbnail generation");
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Initial thumbnail generation cancelled");
                        None
                    },
                    stats = async {
                        tokio::time::sleep(delay).await;
                        engine.generate_all(None).await
                    } => Some(stats),
                }
            })
        });
        EngineHandle { engine: self, task, cancel: token.drop_guard() }
    }
}

/// A running [`Engine`] and its background work.
pub struct EngineHandle {
    engine: Arc<Engine>,
    task: Option<JoinHandle<Option<GenerationStats>>>,
    cancel: DropGuard,
}
impl EngineHandle {
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Whether the start-up scan has finished (or was never scheduled).
    pub fn is_idle(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancels background work and waits for it to stop. Returns the stats of
    /// the start-up scan if it ran to completion.
    pub async fn shutdown(self) -> Option<GenerationStats> {
        let Self { task, cancel, .. } = self;
        drop(cancel);
        task?.await.ok().flatten()
    }
}
