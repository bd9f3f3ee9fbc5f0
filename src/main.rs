mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use futures::StreamExt;
use lookout_config::RawConfig;
use lookout_library::{Engine, FileOutcome, ScanEvent};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = RawConfig::load(cli.config.as_deref())
        .and_then(RawConfig::validate)
        .or_raise(|| ErrorKind::Config)?;
    let engine = Arc::new(Engine::new(config));

    match cli.command {
        Command::Generate { path, json } => generate(&engine, path.as_deref(), json).await,
        Command::Thumbnail { identifier } => match engine.get_thumbnail(&identifier).await {
            Some(path) => {
                println!("{}", path.display());
                Ok(ExitCode::SUCCESS)
            },
            None => {
                eprintln!("Thumbnail not available for {identifier}");
                Ok(ExitCode::FAILURE)
            },
        },
        Command::Status { json } => {
            let status = engine.status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status).or_raise(|| ErrorKind::Output)?);
            } else {
                println!("ffmpeg:      {}", if status.ffmpeg_available { "available" } else { "not found" });
                println!("size:        {}x{}", status.width, status.height);
                println!("folder:      {}", status.thumbnail_folder);
                for path in &status.media_paths {
                    println!("media path:  {}", path.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Run => serve(engine).await,
    }
}

async fn generate(engine: &Engine, path: Option<&Path>, json: bool) -> Result<ExitCode> {
    let mut events = std::pin::pin!(engine.scan(path));
    while let Some(event) = events.next().await {
        match event {
            ScanEvent::File { path, outcome: FileOutcome::Failed } => eprintln!("failed: {}", path.display()),
            ScanEvent::Complete(stats) if json => {
                println!("{}", serde_json::to_string(&stats).or_raise(|| ErrorKind::Output)?);
            },
            ScanEvent::Complete(stats) => println!("{stats}"),
            _ => {},
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn serve(engine: Arc<Engine>) -> Result<ExitCode> {
    let handle = engine.start();
    tracing::info!("Running; press Ctrl-C to stop");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut hangup = signal(SignalKind::hangup()).or_raise(|| ErrorKind::Signal)?;
        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.or_raise(|| ErrorKind::Signal)?;
                    break;
                },
                _ = hangup.recv() => {
                    handle.engine().clear_cache().await;
                },
            }
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.or_raise(|| ErrorKind::Signal)?;

    tracing::info!("Shutting down");
    if let Some(stats) = handle.shutdown().await {
        tracing::debug!(%stats, "Initial thumbnail generation had completed");
    }
    Ok(ExitCode::SUCCESS)
}
