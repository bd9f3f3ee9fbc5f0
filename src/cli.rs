use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lookout", version, about = "Generate and cache preview thumbnails for video and image libraries")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to the per-user
    /// config directory when present.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// More logging; repeat for even more. Ignored when RUST_LOG is set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bring thumbnails up to date for every supported file under PATH, or
    /// under every configured media path.
    Generate {
        path: Option<PathBuf>,
        /// Print the final counters as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the thumbnail path for a media-source URI or filesystem path,
    /// generating it if needed.
    Thumbnail { identifier: String },
    /// Show configuration and whether ffmpeg is usable.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Stay running: generate everything after the start-up delay (if
    /// enabled), then wait for Ctrl-C. SIGHUP clears the lookup cache.
    Run,
}

impl Cli {
    /// Default log filter when `RUST_LOG` isn't set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
