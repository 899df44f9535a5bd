//! Two-Level Cache - Interactive shell
//!
//! Reads commands from stdin, one per line, and runs them against a
//! string-keyed cache configured from environment variables.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use two_level_cache::shell::{self, Command, StringCache};
use two_level_cache::Config;

/// Main entry point for the cache shell.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache, which claims the persistence directory
/// 4. Serve stdin commands until `quit`, end of input, or a shutdown signal
/// 5. Drain pending expiry sweeps
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "two_level_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting two-level cache shell");

    let config = Config::from_env();
    info!(
        "Configuration loaded: memory_max_entries={}, persistence_max_entries={:?}, persistence_dir={}",
        config.memory_max_entries,
        config.persistence_max_entries,
        config.persistence_dir.display()
    );

    let cache: Arc<StringCache> = Arc::new(
        config
            .builder()
            .build()
            .context("failed to build cache")?,
    );

    tokio::select! {
        result = serve(Arc::clone(&cache)) => result?,
        _ = shutdown_signal() => {}
    }

    tokio::task::spawn_blocking(move || cache.shutdown())
        .await
        .context("sweep shutdown task failed")?;

    info!("Shell shutdown complete");
    Ok(())
}

/// Runs stdin commands until `quit` or end of input.
async fn serve(cache: Arc<StringCache>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("ERR {}", message);
                continue;
            }
        };
        let quit = command == Command::Quit;

        // Disk I/O stays off the async workers
        let cache = Arc::clone(&cache);
        let reply = tokio::task::spawn_blocking(move || shell::execute(&cache, command)).await?;
        match reply {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                warn!(error = %e, "Command failed");
                println!("ERR {}", e);
            }
        }

        if quit {
            break;
        }
    }
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
