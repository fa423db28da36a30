//! Wires venues, the settlement core and the orchestrator from configuration

use alloy::providers::Provider;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::info;
use crate::{
    config::{Config, ExecutionMode, PairConfig, VenueConfig, VenueKind},
    feed::PriceFeed,
    network::setup_provider,
    settlement::{Account, ExecutorCapability, Ledger, OperatorCapability, SettlementCore, SettlementParams},
    venues::{FixedGasOracle, GasOracle, LedgerVenue, OnChainVenue, ProviderGasOracle},
    ConcreteProvider,
};
use super::{BlockClock, MarketSimulator, Orchestrator};

/// Largest simulated external trade, as bps of the input-side reserve.
pub const SIMULATED_TRADE_BPS: u32 = 50;
pub const SIMULATED_GAS_PRICE_GWEI: u64 = 1;

/// Everything the binary needs to run one session.
pub struct Deployment {
    pub orchestrator: Arc<Orchestrator>,
    pub clock: Arc<BlockClock>,
    /// Owner token of the settlement core (pause, withdraw).
    pub operator: OperatorCapability,
    pub simulator: Option<MarketSimulator>,
    pub provider: Option<Arc<ConcreteProvider>>,
}

pub async fn deploy(config: &Config) -> Result<Deployment> {
    match config.mode {
        ExecutionMode::Simulation => deploy_simulation(config, SIMULATED_GAS_PRICE_GWEI),
        ExecutionMode::Shadow => deploy_shadow(config).await,
    }
}

fn settlement_params(config: &Config) -> SettlementParams {
    SettlementParams {
        min_settlement_spacing_blocks: config.min_settlement_spacing_blocks,
        lender_fee_bps: config.lender_fee_bps,
    }
}

fn new_feed(config: &Config) -> PriceFeed {
    PriceFeed::new(config.retry_config(), config.venue_timeout(), config.quote_staleness_secs)
}

/// Deploys the core on `ledger`, funds the lender with each pair's loan
/// ceiling and authorizes the orchestrator's executor identity.
fn deploy_core(config: &Config, ledger: &Ledger) -> Result<(Arc<SettlementCore>, OperatorCapability, ExecutorCapability)> {
    let (core, operator) = SettlementCore::deploy(ledger.clone(), settlement_params(config));
    for pair in &config.pairs {
        ledger
            .mint(Account::Lender, pair.pair.asset_b, pair.max_loan)
            .with_context(|| format!("funding lender for {}", pair.id))?;
    }
    let executor = core
        .authorize_executor(&operator)
        .ok_or_else(|| anyhow!("freshly deployed core refused its owner"))?;
    Ok((Arc::new(core), operator, executor))
}

/// Simulation mode: every venue is a pool on the in-process ledger, blocks
/// are a fixed tick counter and a [`MarketSimulator`] moves the pools.
pub fn deploy_simulation(config: &Config, gas_price_gwei: u64) -> Result<Deployment> {
    let ledger = Ledger::new();
    let clock = Arc::new(BlockClock::new(0));
    let mut feed = new_feed(config);
    let mut simulator = MarketSimulator::new(ledger.clone(), SIMULATED_TRADE_BPS);

    for pair in &config.pairs {
        for venue in [&pair.first_venue, &pair.second_venue] {
            let venue = Arc::new(seed_ledger_venue(&ledger, pair, venue)?.with_blocks(clock.subscribe()));
            feed.register(venue.clone());
            simulator.add_venue(venue, pair.pair);
        }
    }

    let (core, operator, executor) = deploy_core(config, &ledger)?;
    let gas: Arc<dyn GasOracle> = Arc::new(FixedGasOracle::from_gwei(gas_price_gwei));
    let orchestrator = Orchestrator::new(config.clone(), Arc::new(feed), gas, core, executor);

    info!("🎭 Simulation deployed with {} pairs", config.pairs.len());
    Ok(Deployment {
        orchestrator: Arc::new(orchestrator),
        clock,
        operator,
        simulator: Some(simulator),
        provider: None,
    })
}

fn seed_ledger_venue(ledger: &Ledger, pair: &PairConfig, venue: &VenueConfig) -> Result<LedgerVenue> {
    match venue.kind {
        VenueKind::Ledger { reserve_a, reserve_b } => Ok(LedgerVenue::seed(
            venue.id.clone(),
            ledger.clone(),
            &pair.pair,
            reserve_a,
            reserve_b,
            venue.fee_bps,
        )),
        VenueKind::OnChain { .. } => Err(anyhow!(
            "venue {} of {} is on-chain; simulation mode needs ledger venues",
            venue.id,
            pair.id
        )),
    }
}

/// Shadow mode: quotes come from on-chain pools, and each admitted
/// settlement runs on a ledger copy synced from those quotes.
pub async fn deploy_shadow(config: &Config) -> Result<Deployment> {
    let rpc_url = config.rpc_url.as_deref().context("RPC_URL is required in shadow mode")?;
    let provider = setup_provider(rpc_url).await?;
    let start = provider
        .get_block_number()
        .await
        .map_err(|e| anyhow!("Failed to read starting block: {}", e))?;

    let ledger = Ledger::new();
    let clock = Arc::new(BlockClock::new(start));
    let mut feed = new_feed(config);

    for pair in &config.pairs {
        for venue in [&pair.first_venue, &pair.second_venue] {
            let VenueKind::OnChain { pool } = venue.kind else {
                return Err(anyhow!("venue {} of {} must be on-chain in shadow mode", venue.id, pair.id));
            };
            feed.register(Arc::new(OnChainVenue::new(venue.id.clone(), pool, venue.fee_bps, provider.clone())));
        }
    }

    let (core, operator, executor) = deploy_core(config, &ledger)?;
    let gas: Arc<dyn GasOracle> = Arc::new(ProviderGasOracle::new(provider.clone()));
    let orchestrator = Orchestrator::new(config.clone(), Arc::new(feed), gas, core, executor);

    info!("👀 Shadow mode deployed at block {} with {} pairs", start, config.pairs.len());
    Ok(Deployment {
        orchestrator: Arc::new(orchestrator),
        clock,
        operator,
        simulator: None,
        provider: Some(provider),
    })
}
