//! icie: terminal front end for the icie worker.

mod cli;
mod config;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use icie::bridge::{BinarySpawner, WorkerBridge};
use icie::{Directory, Orchestrator};

use cli::{Cli, Command};
use config::Settings;
use terminal::TerminalHost;

/// `RUST_LOG` wins; otherwise `ICIE_LOG` picks the level for icie's own
/// targets. `LOG_FORMAT=json` switches to JSON lines. Logs go to stderr.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("ICIE_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("info") => "info",
            Ok("error") => "error",
            _ => "warn",
        };
        EnvFilter::new(format!("icie={level},icie_cli={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    let worker = cli
        .worker
        .or_else(|| settings.worker.clone())
        .context("no worker executable configured; pass --worker or set `worker` in icie.toml")?;
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to read the current directory")?,
    };

    tracing::debug!(worker = %worker.display(), root = %root.display(), "Starting");
    let bridge = WorkerBridge::spawn(&BinarySpawner::new(&worker))
        .with_context(|| format!("failed to start worker {}", worker.display()))?;
    let host = Arc::new(TerminalHost::new(settings.core()));
    let mut orchestrator = Orchestrator::connect(Directory::new(root), bridge, host)
        .await
        .context("failed to announce the workspace to the worker")?;

    let outcome = run(&mut orchestrator, cli.command).await;
    match &outcome {
        Ok(_) => {
            if let Err(e) = orchestrator.dispatch_pending().await {
                tracing::debug!(error = %e, "Worker gone before trailing reactions were read");
            }
        }
        Err(e) if e.is_fatal() => tracing::warn!(error = %e, "Worker connection lost"),
        Err(_) => {}
    }
    if let Err(e) = orchestrator.shutdown().await {
        tracing::warn!(error = %e, "Worker shutdown failed");
    }
    outcome.with_context(|| format!("icie {} failed", cli.command.name()))
}

async fn run(orchestrator: &mut Orchestrator, command: Command) -> icie::Result<ExitCode> {
    match command {
        Command::Build => {
            orchestrator.build().await?;
            println!("Build succeeded");
        }
        Command::Test => {
            if !orchestrator.test().await? {
                eprintln!("Some tests failed");
                return Ok(ExitCode::FAILURE);
            }
            println!("All tests passed");
        }
        Command::Submit => {
            orchestrator.submit().await?;
            println!("Submitted");
        }
        Command::Init => {
            orchestrator.init().await?;
        }
        Command::ManualSubmit => orchestrator.manual_submit().await?,
        Command::Template => orchestrator.instantiate_template().await?,
    }
    Ok(ExitCode::SUCCESS)
}
