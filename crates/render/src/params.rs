use crate::MediaKind;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Output geometry and quality shared by every thumbnail of one configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderParams {
    pub width: u32,
    pub height: u32,
    /// 0-100, higher is better.
    pub quality: u8,
    /// Seek offset into videos, in seconds.
    pub frame_position: f64,
}
impl Default for RenderParams {
    fn default() -> Self {
        Self { width: 320, height: 180, quality: 70, frame_position: 0.5 }
    }
}
impl RenderParams {
    /// Maps the 0-100 quality onto ffmpeg's `-q:v` scale, where lower numbers
    /// mean better quality.
    pub fn qscale(&self) -> u32 {
        let quality = f64::from(self.quality.min(100));
        // Bounded to 0..=30 by the clamp above, so the cast can't truncate.
        ((100.0 - quality) / 3.33).round() as u32
    }

    /// Scale to fit inside `width`x`height` keeping the aspect ratio, then pad
    /// (centered) to exactly `width`x`height`.
    pub fn filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!("scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2")
    }
}

/// Wall-clock budgets for a single tool invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub video: Duration,
    pub image: Duration,
    /// For the one-time availability probe. Running out counts as unavailable.
    pub probe: Duration,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self {
            video: Duration::from_secs(30),
            image: Duration::from_secs(15),
            probe: Duration::from_secs(10),
        }
    }
}
impl Timeouts {
    pub fn for_kind(&self, kind: MediaKind) -> Duration {
        match kind {
            MediaKind::Video => self.video,
            MediaKind::Image => self.image,
        }
    }
}

/// One fully-specified render: read `source`, write a single frame to `output`.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    pub kind: MediaKind,
    pub source: PathBuf,
    pub output: PathBuf,
    pub params: RenderParams,
}
impl RenderJob {
    /// The argument vector (excluding the program itself) for ffmpeg.
    ///
    /// `-ss` goes before `-i` so ffmpeg seeks on the input instead of decoding
    /// every frame up to the offset.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into()];
        if self.kind == MediaKind::Video {
            args.push("-ss".into());
            args.push(self.params.frame_position.to_string().into());
        }
        args.push("-i".into());
        args.push(self.source.clone().into_os_string());
        if self.kind == MediaKind::Video {
            args.push("-vframes".into());
            args.push("1".into());
        }
        args.push("-vf".into());
        args.push(self.params.filter().into());
        args.push("-q:v".into());
        args.push(self.params.qscale().to_string().into());
        args.push(self.output.clone().into_os_string());
        args
    }
}
