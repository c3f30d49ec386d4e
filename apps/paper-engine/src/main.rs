//! Paper Engine Binary
//!
//! Replays a JSON-lines stream of engine inputs (instruments, ticks, trade
//! requests, commands) through the paper execution engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin paper-engine -- inputs.jsonl
//! cat inputs.jsonl | cargo run --bin paper-engine
//! ```
//!
//! With a file argument the engine runs in replay mode: time comes only from
//! tick and clock records. Reading stdin keeps the wall-clock expiry timer.
//!
//! # Environment Variables
//!
//! - `PAPER_ENGINE_CONFIG`: Config file path (default: config/paper-engine.yaml)
//! - `RUST_LOG`: Log filter (overrides `logging.level`)

use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;

use anyhow::Context;
use paper_engine::application::dto::EngineInput;
use paper_engine::application::services::{EngineHandle, EngineLoopConfig};
use paper_engine::config::{Config, DEFAULT_CONFIG_PATH, load_config};
use paper_engine::domain::shared::Timestamp;
use paper_engine::error::ErrorCode;
use paper_engine::infrastructure::config::Container;
use paper_engine::observability::{MetricsConfig, init_metrics};
use paper_engine::telemetry::init_telemetry;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "PAPER_ENGINE_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = read_config()?;
    init_telemetry(&config.logging).context("failed to initialize tracing")?;

    tracing::info!("Starting Paper Engine");

    if config.metrics.enabled {
        let addr: SocketAddr = config
            .metrics
            .listen_addr
            .parse()
            .with_context(|| format!("invalid metrics address {}", config.metrics.listen_addr))?;
        init_metrics(&MetricsConfig::with_addr(addr)).context("failed to start metrics exporter")?;
    }

    let input_path = std::env::args().nth(1);
    let replay = input_path.is_some();

    let mut container = Container::from_config(&config).context("failed to build engine")?;
    if replay {
        let loop_config = EngineLoopConfig {
            clock_interval: None,
            ..container.loop_config().clone()
        };
        container = container.with_loop_config(loop_config);
    }

    let shutdown = CancellationToken::new();
    let mut engine_loop = container.engine_loop(shutdown.clone());
    if engine_loop.restore().await.context("failed to restore snapshot")? {
        tracing::info!("Restored engine state from snapshot");
    }
    let (handle, task) = engine_loop.spawn();

    let reader: Pin<Box<dyn AsyncRead + Send>> = match &input_path {
        Some(path) => Box::pin(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {path}"))?,
        ),
        None => Box::pin(tokio::io::stdin()),
    };

    tracing::info!(
        source = input_path.as_deref().unwrap_or("stdin"),
        replay,
        "Paper engine ready"
    );

    let processed = feed(&handle, reader, replay).await?;
    tracing::info!(processed, "Input stream finished");

    match handle.summary().await {
        Ok(summary) => tracing::info!(
            realized = %summary.realized_pnl,
            unrealized = %summary.unrealized_pnl,
            total = %summary.total_pnl,
            fees = %summary.total_fees,
            open_positions = summary.open_positions,
            pending_orders = summary.pending_orders,
            closed_trades = summary.closed_trades,
            "Portfolio summary"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to read portfolio summary"),
    }

    shutdown.cancel();
    task.await.context("engine loop panicked")?;

    tracing::info!("Paper engine stopped");
    Ok(())
}

/// Load the config file, falling back to defaults when the default path is absent.
fn read_config() -> anyhow::Result<Config> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_config(Some(&path)).with_context(|| format!("failed to load {path}"));
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return load_config(None).context("failed to load default config");
    }
    Ok(Config::default())
}

/// Push every input line into the engine until EOF or a shutdown signal.
///
/// Returns the number of records dispatched.
async fn feed(
    handle: &EngineHandle,
    reader: Pin<Box<dyn AsyncRead + Send>>,
    replay: bool,
) -> anyhow::Result<usize> {
    let mut lines = BufReader::new(reader).lines();
    let mut last_seen: Option<Timestamp> = None;
    let mut processed = 0usize;

    let stop = shutdown_signal();
    tokio::pin!(stop);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            () = &mut stop => break,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let input: EngineInput = match serde_json::from_str(line) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(error = %e, line, "Skipping malformed input");
                continue;
            }
        };

        let now = match input_time(&input) {
            Some(at) => {
                last_seen = Some(at);
                at
            }
            None if replay => last_seen.unwrap_or_else(Timestamp::now),
            None => Timestamp::now(),
        };

        match handle.dispatch(input, now).await {
            Ok(()) => processed += 1,
            Err(e) if e.code() == ErrorCode::EngineStopped => {
                tracing::error!(error = %e, "Engine loop stopped");
                return Err(e.into());
            }
            Err(e) if e.code().is_recoverable() => {
                tracing::warn!(code = %e.code(), error = %e, "Input rejected");
                processed += 1;
            }
            Err(e) => {
                tracing::error!(code = %e.code(), error = %e, "Position halted");
                processed += 1;
            }
        }
    }

    Ok(processed)
}

/// Timestamp carried by the input itself.
const fn input_time(input: &EngineInput) -> Option<Timestamp> {
    match input {
        EngineInput::Tick(tick) => Some(tick.timestamp),
        EngineInput::Clock { at } => Some(*at),
        _ => None,
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
