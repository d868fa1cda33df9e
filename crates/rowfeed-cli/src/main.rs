#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::{
    config::{CliArgs, CliConfig, OutputFormat},
    input::{apply_edits, spawn_stdin_reader},
    render::render,
    telemetry::init_tracing,
};
use core::time::Duration;
use rowfeed::{DisplayController, DisplayView, SeededRandom, ThreadRandom};
use std::{io::Write, sync::Arc};
use tokio::{signal, sync::watch};
use tokio_stream::{StreamExt, wrappers::WatchStream};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_tracing()?;
    log_startup_info(&config);

    let controller = match config.seed {
        Some(seed) => DisplayController::start_with(
            config.display.clone(),
            SeededRandom::new(seed),
            config.quiet,
        ),
        None => DisplayController::start_with(config.display.clone(), ThreadRandom, config.quiet),
    };

    // Only changes are relayed by the controller; kick off the first schedule
    // ourselves.
    controller.update_settings(config.display.settings()?).await?;

    let printer = tokio::spawn(print_views(controller.subscribe(), config.format));
    let editor = tokio::spawn(apply_edits(spawn_stdin_reader(), controller.clone()));

    shutdown_signal(config.run_for).await;

    tracing::info!("Shutdown signal received, terminating gracefully...");
    controller.shutdown().await;
    editor.abort();
    printer.abort();

    tracing::info!("Shut down successfully");
    Ok(())
}

fn log_startup_info(config: &CliConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting rowfeed with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting rowfeed: {} records every {}ms",
            config.display.array_size,
            config.display.interval
        );
    }
}

async fn print_views(views: watch::Receiver<Arc<DisplayView>>, format: OutputFormat) {
    let mut views = WatchStream::from_changes(views);
    while let Some(view) = views.next().await {
        match render(&view, format) {
            Ok(text) => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{text}") {
                    tracing::error!("Failed to write view: {e}");
                    break;
                }
            }
            Err(e) => tracing::error!("Failed to render view: {e}"),
        }
    }
}

async fn shutdown_signal(run_for: Option<Duration>) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let deadline = async {
        match run_for {
            Some(dur) => tokio::time::sleep(dur).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
        () = deadline => tracing::info!("Run time elapsed"),
    }
}
