//! Scripted frame tool for testing.

use crate::error::{ErrorKind, Result};
use crate::{FrameTool, RenderJob};
use async_trait::async_trait;
use exn::ResultExt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What [`MockTool::render_frame`] does when called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockBehaviour {
    /// Write a small placeholder JPEG to the job's output path.
    Succeed,
    /// Exit with the given code without writing anything.
    Fail(i32),
    /// Pretend to succeed without writing anything.
    SucceedWithoutOutput,
    /// Sleep for the given duration, then succeed.
    Hang(Duration),
}

/// In-memory stand-in for ffmpeg.
///
/// Counts every call so tests can assert how many subprocesses *would* have
/// been started, and records every job it was asked to render.
///
/// # Examples
///
/// ```
/// use lookout_render::{MockBehaviour, MockTool, Renderer};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tool = Arc::new(MockTool::unavailable());
/// let renderer = Renderer::builder(tool.clone()).build();
/// assert!(!renderer.render_image("in.png", "out.jpg").await);
/// assert_eq!(tool.render_calls(), 0);
/// # }
/// ```
pub struct MockTool {
    available: bool,
    probe_delay: Option<Duration>,
    behaviour: Mutex<MockBehaviour>,
    probes: AtomicUsize,
    renders: AtomicUsize,
    jobs: Mutex<Vec<RenderJob>>,
}

impl MockTool {
    pub fn new(behaviour: MockBehaviour) -> Self {
        Self {
            available: true,
            probe_delay: None,
            behaviour: Mutex::new(behaviour),
            probes: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// A tool that reports itself as missing on probe.
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new(MockBehaviour::Succeed) }
    }

    /// Makes the probe sleep for `delay` before answering.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    /// Change behaviour for subsequent renders.
    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *self.behaviour.lock().unwrap_or_else(|e| e.into_inner()) = behaviour;
    }

    pub fn probe_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Every job passed to [`render_frame`](FrameTool::render_frame), in call order.
    pub fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
impl Default for MockTool {
    fn default() -> Self {
        Self::new(MockBehaviour::Succeed)
    }
}

#[async_trait]
impl FrameTool for MockTool {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        self.available
    }

    async fn render_frame(&self, job: &RenderJob) -> Result<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).push(job.clone());
        let behaviour = *self.behaviour.lock().unwrap_or_else(|e| e.into_inner());
        match behaviour {
            MockBehaviour::Succeed => {},
            MockBehaviour::Fail(code) => exn::bail!(ErrorKind::ToolFailed(Some(code))),
            MockBehaviour::SucceedWithoutOutput => return Ok(()),
            MockBehaviour::Hang(duration) => tokio::time::sleep(duration).await,
        }
        // SOI + EOI markers; enough for anything that only checks existence.
        tokio::fs::write(&job.output, [0xFF, 0xD8, 0xFF, 0xD9]).await.or_raise(|| ErrorKind::Io)
    }
}
