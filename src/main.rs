//! Atomic Arbitrage Bot - Main Entry Point

use atomic_arb_bot::*;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Interval between session statistics reports.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);
/// Block polling interval in shadow mode.
const BLOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = CONFIG.clone();

    // Initialize logging
    let _logging_guard = utils::setup_logging(&config.output_dir)?;
    utils::setup_output_directories(&config.output_dir)?;

    config.load_pairs()?;
    config.validate()?;

    info!("⚛️  Atomic Arbitrage Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Mode: {:?}", config.mode);
    info!("   Pairs: {}", config.pairs.len());
    for pair in &config.pairs {
        info!("     {}: {} <-> {}", pair.id, pair.first_venue.id, pair.second_venue.id);
    }
    info!("   Tick: {}ms", config.tick_interval_ms);
    info!("   Min Divergence: {}%", config.min_divergence_pct);
    info!("   Max Divergence: {}% (venue deviation {}%)", config.max_divergence_pct, config.max_venue_deviation_pct);
    info!("   Min Profit: {} bps", config.min_profit_bps);
    info!("   Max Price Deviation: {} bps", config.max_price_deviation_bps);
    info!("   Lender Fee: {} bps", config.lender_fee_bps);
    info!("   Breaker: {} failures, {}s cooldown", config.max_consecutive_failures, config.circuit_breaker_cooldown_secs);
    info!("   Max Gas Price: {} gwei", config.max_gas_price_gwei);
    if config.mode == config::ExecutionMode::Shadow {
        info!("   ⚠️  SHADOW MODE - settlements run on a synced ledger copy, no funds at risk");
    }

    let deployment = execution::deploy(&config).await?;

    // Setup shutdown handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("\n📛 Received shutdown signal (Ctrl+C)..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    let clock = Arc::clone(&deployment.clock);
    let clock_task = match &deployment.provider {
        Some(provider) => tokio::spawn(Arc::clone(&clock).follow_provider(
            Arc::clone(provider),
            BLOCK_POLL_INTERVAL,
            shutdown_rx.clone(),
        )),
        None => tokio::spawn(Arc::clone(&clock).run_ticks(
            Duration::from_millis(config.tick_interval_ms),
            shutdown_rx.clone(),
        )),
    };

    let simulator_task = deployment.simulator.map(|simulator| {
        tokio::spawn(simulator.run(Duration::from_millis(config.tick_interval_ms), shutdown_rx.clone()))
    });

    let orchestrator = Arc::clone(&deployment.orchestrator);
    let report_task = tokio::spawn(Arc::clone(&orchestrator).run_reports(REPORT_INTERVAL, shutdown_rx.clone()));

    info!("\n🚀 Starting pair monitoring...\n");
    Arc::clone(&orchestrator).run(clock.subscribe(), shutdown_rx).await;

    for task in [Some(clock_task), simulator_task, Some(report_task)].into_iter().flatten() {
        if let Err(e) = task.await {
            warn!("Background task ended abnormally: {}", e);
        }
    }

    // Print final statistics
    orchestrator.report().await;
    if !orchestrator.health().await.is_healthy() {
        warn!("⚠️  Session ended unhealthy");
    }

    Ok(())
}
