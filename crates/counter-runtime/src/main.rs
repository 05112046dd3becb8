//! # Poll Counter
//!
//! Consumes votes from the bus, counts them in memory and flushes per-option
//! increments to the configured store.
//!
//! ```text
//! TCP clients ──lines──→ Ingress ──publish──→ Bus [votes/counter]
//!                                                   │
//!                                                   ↓
//!                                           VoteBusAdapter
//!                                                   │ on_message
//!                                                   ↓
//!                        Store ←──increment── FlushDriver ←──snapshot── Tally
//! ```
//!
//! Exit status is 1 on any fatal error (bad configuration, store or bus
//! unreachable, subscription lost).

use anyhow::{Context, Result};
use counter_runtime::{load_config, CounterRuntime};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if tracing::dispatcher::has_been_set() {
            error!("Fatal: {:#}", e);
        } else {
            eprintln!("Fatal: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Install the global subscriber: RUST_LOG, then PC_LOG_LEVEL, then info.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("PC_LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

async fn run() -> Result<()> {
    init_logging()?;

    info!("===========================================");
    info!("  Poll Counter v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    // Load configuration
    let config = load_config();
    let runtime = CounterRuntime::new(config)
        .await
        .context("Counter startup failed")?;

    let metrics = runtime
        .run(
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            },
            |addr| info!(%addr, "Counter is ready. Press Ctrl+C to stop."),
        )
        .await
        .context("Counter stopped")?;

    info!(
        metrics = %serde_json::to_string(&metrics).unwrap_or_default(),
        "Final metrics"
    );
    Ok(())
}
