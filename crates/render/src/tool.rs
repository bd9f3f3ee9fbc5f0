//! The external frame-extraction capability.
//!
//! [`Renderer`](crate::Renderer) never spawns processes itself; it talks to a
//! [`FrameTool`]. Production code uses [`Ffmpeg`], tests use
//! [`MockTool`](crate::MockTool) (feature `mock`).

use crate::RenderJob;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

#[async_trait]
pub trait FrameTool: Send + Sync {
    /// Human-readable name, used for logging only.
    fn name(&self) -> &str;

    /// Returns `true` if the tool can be invoked. Called at most once per
    /// [`Renderer`](crate::Renderer).
    async fn probe(&self) -> bool;

    /// Renders `job.source` into `job.output`. Must not return `Ok` unless
    /// the tool itself reported success.
    ///
    /// Implementations that spawn processes must make sure the child dies
    /// when this future is dropped (timeouts are enforced by dropping it).
    async fn render_frame(&self, job: &RenderJob) -> Result<()>;
}

/// ffmpeg, run as a subprocess.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    program: PathBuf,
}
impl Ffmpeg {
    /// Uses `program` as-is (absolute path, or a bare name resolved by the OS).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Looks for `ffmpeg` on `PATH`. When it can't be found the bare name is
    /// kept anyway; the probe will then report the tool as unavailable.
    pub fn discover() -> Self {
        match which::which("ffmpeg") {
            Ok(path) => {
                tracing::trace!(ffmpeg = %path.display(), "Discovered ffmpeg on system");
                Self::new(path)
            },
            Err(_) => {
                tracing::debug!("ffmpeg executable not found in PATH");
                Self::new("ffmpeg")
            },
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}
impl Default for Ffmpeg {
    fn default() -> Self {
        Self::discover()
    }
}

#[async_trait]
impl FrameTool for Ffmpeg {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self) -> bool {
        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(program = %self.program.display(), error = %e, "Could not execute ffmpeg");
                false
            },
        }
    }

    async fn render_frame(&self, job: &RenderJob) -> Result<()> {
        let output = Command::new(&self.program)
            .args(job.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                source = %job.source.display(),
                stderr = %stderr.trim(),
                "ffmpeg failed to render thumbnail"
            );
            exn::bail!(ErrorKind::ToolFailed(output.status.code()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MediaKind, RenderParams};

    #[tokio::test]
    async fn test_probe_missing_program() {
        let tool = Ffmpeg::new("/definitely/not/a/real/ffmpeg");
        assert!(!tool.probe().await);
    }

    #[tokio::test]
    async fn test_render_missing_program_is_io_error() {
        let tool = Ffmpeg::new("/definitely/not/a/real/ffmpeg");
        let job = RenderJob {
            kind: MediaKind::Image,
            source: PathBuf::from("in.png"),
            output: PathBuf::from("out.jpg"),
            params: RenderParams::default(),
        };
        let err = tool.render_frame(&job).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io));
    }

    #[tokio::test]
    async fn test_render_bad_input_fails() {
        // Only meaningful where ffmpeg is actually installed.
        let Ok(path) = which::which("ffmpeg") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"this is not a png").unwrap();
        let job = RenderJob {
            kind: MediaKind::Image,
            source,
            output: dir.path().join("out.jpg"),
            params: RenderParams::default(),
        };
        let err = Ffmpeg::new(path).render_frame(&job).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolFailed(Some(_))));
    }

    #[test]
    fn test_program_is_kept_as_given() {
        assert_eq!(Ffmpeg::new("/opt/ffmpeg/bin/ffmpeg").program(), std::path::Path::new("/opt/ffmpeg/bin/ffmpeg"));
    }

    /// Writes an executable shell script standing in for ffmpeg.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &std::path::Path, body: &str) -> Ffmpeg {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Ffmpeg::new(path)
    }

    #[cfg(unix)]
    fn job_in(dir: &std::path::Path) -> RenderJob {
        RenderJob {
            kind: MediaKind::Video,
            source: dir.join("clip.mp4"),
            output: dir.join("out.jpg"),
            params: RenderParams::default(),
        }
    }

    #[cfg(unix)]
    #[rstest::rstest]
    #[case("exit 0", true)]
    #[case("exit 1", false)]
    #[case(r#"[ "$1" = "-version" ] || exit 2"#, true)]
    #[tokio::test]
    async fn test_availability_follows_exit_status(#[case] body: &str, #[case] expected: bool) {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(fake_ffmpeg(dir.path(), body).probe().await, expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_reports_code() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_ffmpeg(dir.path(), "echo 'Invalid data found when processing input' >&2\nexit 3");
        let err = tool.render_frame(&job_in(dir.path())).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolFailed(Some(3))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        // The output path is the last argument.
        let tool = fake_ffmpeg(dir.path(), r#"for last; do :; done; printf 'jpg' > "$last""#);
        let job = job_in(dir.path());
        tool.render_frame(&job).await.unwrap();
        assert_eq!(std::fs::read(&job.output).unwrap(), b"jpg");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropped_render_kills_child() {
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let tool = fake_ffmpeg(dir.path(), &format!("echo $$ > '{}'\nexec sleep 30", pidfile.display()));
        let result = tokio::time::timeout(Duration::from_secs(1), tool.render_frame(&job_in(dir.path()))).await;
        assert!(result.is_err(), "render should still have been running");

        let pid = std::fs::read_to_string(&pidfile).unwrap().trim().to_string();
        let stat = std::path::PathBuf::from(format!("/proc/{pid}/stat"));
        // Gone, or at least dead and waiting to be reaped.
        let dead = || match std::fs::read_to_string(&stat) {
            Err(_) => true,
            Ok(line) => line
                .rsplit_once(')')
                .is_some_and(|(_, rest)| matches!(rest.trim_start().chars().next(), Some('Z' | 'X'))),
        };
        let started = Instant::now();
        while !dead() {
            assert!(started.elapsed() < Duration::from_secs(5), "process {pid} still running");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
