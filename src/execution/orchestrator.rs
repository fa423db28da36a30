//! Per-pair control loop: feed -> detector -> sizer -> risk gate -> settlement

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use crate::{
    arbitrage::{DivergenceBounds, SizingParams, detect_opportunity, estimate_execution_cost, size_trade},
    config::{Config, ExecutionMode, PairConfig},
    errors::{BotError, BotResult, RecoveryAction, recovery_action},
    feed::PriceFeed,
    network::retry_with_backoff,
    risk::{BreakerLimits, BreakerStatus, BreakerTransition, CircuitBreakerState, GateContext, RiskGate, SharedBreaker},
    settlement::{ExecutorCapability, Pool, SettlementCore},
    storage::{RejectionRecord, save_rejection, save_settlement_outcome},
    types::{HealthStatus, RejectReason, SettlementContext, SettlementOutcome, SettlementRequest, VenueId, VenueQuote},
    utils::{print_rejection, print_session_stats, print_settlement_outcome, print_sized_trade, run_health_check},
    venues::GasOracle,
};
use super::SessionStats;

/// Name the gas oracle is reported under in retry logs and errors.
const GAS_ORACLE: &str = "gas-oracle";

/// What one pair cycle ended with.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    NoOpportunity,
    /// An opportunity existed but no size clears costs and the profit floor.
    Unprofitable,
    Rejected(RejectReason),
    Settled(SettlementOutcome),
    /// The circuit breaker is tripped; nothing was attempted.
    Halted(String),
}

pub struct Orchestrator {
    config: Config,
    feed: Arc<PriceFeed>,
    gas: Arc<dyn GasOracle>,
    bounds: DivergenceBounds,
    gate: RiskGate,
    limits: BreakerLimits,
    breaker: SharedBreaker,
    core: Arc<SettlementCore>,
    executor: ExecutorCapability,
    stats: Mutex<SessionStats>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        feed: Arc<PriceFeed>,
        gas: Arc<dyn GasOracle>,
        core: Arc<SettlementCore>,
        executor: ExecutorCapability,
    ) -> Self {
        Self {
            bounds: DivergenceBounds::from_config(&config),
            gate: RiskGate::from_config(&config),
            limits: BreakerLimits::from_config(&config),
            breaker: CircuitBreakerState::shared(),
            config,
            feed,
            gas,
            core,
            executor,
            stats: Mutex::new(SessionStats::new()),
        }
    }

    pub fn pairs(&self) -> &[PairConfig] {
        &self.config.pairs
    }

    pub fn feed(&self) -> &Arc<PriceFeed> {
        &self.feed
    }

    pub fn breaker(&self) -> &SharedBreaker {
        &self.breaker
    }

    pub fn core(&self) -> &Arc<SettlementCore> {
        &self.core
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.lock().clone()
    }

    /// Runs one detection/settlement cycle for `pair` at `block`.
    ///
    /// Feed and gas oracle failures are returned as errors; every other
    /// result, including rejections and aborts, is a [`CycleOutcome`].
    pub async fn run_cycle(&self, pair: &PairConfig, block: u64) -> BotResult<CycleOutcome> {
        self.stats.lock().cycles += 1;

        if let BreakerStatus::Tripped { reason } = self.breaker.read().await.status(Instant::now()) {
            error!(pair = %pair.id, reason = %reason, "🛑 Circuit breaker TRIPPED, settlement halted until reset");
            return Ok(CycleOutcome::Halted(reason));
        }

        let (first, second) = self.feed.fetch_pair(pair).await?;
        let Some(opportunity) = detect_opportunity(pair, &first, &second, &self.bounds) else {
            return Ok(CycleOutcome::NoOpportunity);
        };
        self.stats.lock().opportunities += 1;
        debug!(
            pair = %pair.id,
            buy = %opportunity.buy_venue,
            sell = %opportunity.sell_venue,
            divergence_pct = %opportunity.divergence_pct,
            "opportunity detected"
        );

        let (buy, sell) = if opportunity.buy_venue == first.venue {
            (&first, &second)
        } else {
            (&second, &first)
        };

        let gas_price_wei = self.fetch_gas_price().await?;
        let execution_cost = estimate_execution_cost(
            gas_price_wei,
            self.config.gas_per_settlement,
            pair.native_price,
            pair.pair.decimals_b,
        );
        let params = SizingParams {
            max_position: pair.max_position,
            max_loan: pair.max_loan,
            max_price_impact_bps: pair.max_price_impact_bps,
            lender_fee_bps: self.core.lender().fee_bps(),
            execution_cost,
            min_profit_bps: self.config.min_profit_bps,
        };
        let Some(trade) = size_trade(&opportunity, buy, sell, &params) else {
            self.stats.lock().unprofitable += 1;
            debug!(pair = %pair.id, execution_cost, "no profitable size");
            return Ok(CycleOutcome::Unprofitable);
        };
        print_sized_trade(&trade);

        let decision = {
            let breaker = self.breaker.read().await;
            let ctx = GateContext { now: Instant::now(), gas_price_wei, buy_quote: buy, sell_quote: sell };
            self.gate.admit(&breaker, pair, &trade, &ctx)
        };
        if let Some(reason) = decision.reason {
            self.stats.lock().rejections += 1;
            let record = RejectionRecord::new(&trade, reason.clone());
            print_rejection(&record);
            if let Err(e) = save_rejection(&self.config.output_dir, &record) {
                warn!("⚠️ Failed to save rejection record: {}", e);
            }
            return Ok(CycleOutcome::Rejected(reason));
        }

        if self.config.mode == ExecutionMode::Shadow {
            self.sync_pools(pair, buy, sell);
        }

        let request = SettlementRequest {
            pair_id: pair.id.clone(),
            asset: pair.pair.asset_b,
            borrow_amount: trade.input_amount,
            intermediate_asset: pair.pair.asset_a,
            buy_venue: opportunity.buy_venue.clone(),
            sell_venue: opportunity.sell_venue.clone(),
            expected_leg1_out: trade.expected_intermediate,
            expected_leg2_out: trade.expected_output_amount,
            min_acceptable_profit_bps: self.config.min_profit_bps,
            max_slippage_bps: pair.max_slippage_bps,
            max_price_deviation_bps: self.config.max_price_deviation_bps,
            deadline_block: block.saturating_add(self.config.deadline_blocks),
        };
        let ctx = SettlementContext {
            block,
            execution_cost,
            gas_spent_wei: gas_price_wei.saturating_mul(self.config.gas_per_settlement as u128),
        };
        let outcome = self.core.settle(&self.executor, &request, ctx);

        let transition = {
            let mut breaker = self.breaker.write().await;
            let now = Instant::now();
            breaker.record_attempt(&pair.id, now);
            breaker.record_outcome(&outcome, pair.pair.decimals_b, &self.limits, now)
        };
        if transition == BreakerTransition::Tripped {
            error!(pair = %pair.id, "🛑 Settlement halted for all pairs until the breaker is reset");
        }

        {
            let mut stats = self.stats.lock();
            stats.settlements += 1;
            if outcome.success {
                stats.successful_settlements += 1;
                stats.realized_profit = stats.realized_profit.saturating_add(outcome.profit_realized);
            }
        }
        print_settlement_outcome(&outcome, pair.pair.decimals_b);
        if let Err(e) = save_settlement_outcome(&self.config.output_dir, &outcome) {
            warn!("⚠️ Failed to save settlement outcome: {}", e);
        }

        Ok(CycleOutcome::Settled(outcome))
    }

    /// Current gas price under the same per-attempt timeout and retry budget
    /// as venue quotes.
    async fn fetch_gas_price(&self) -> BotResult<u128> {
        retry_with_backoff(
            || self.gas.gas_price_wei(),
            &self.config.retry_config(),
            &VenueId::new(GAS_ORACLE),
            self.config.venue_timeout(),
        )
        .await
    }

    /// Replaces the ledger pools of both venues with the freshly observed
    /// reserves, so the settlement runs against current chain state.
    fn sync_pools(&self, pair: &PairConfig, buy: &VenueQuote, sell: &VenueQuote) {
        for quote in [buy, sell] {
            self.core.ledger().add_pool(
                quote.venue.clone(),
                Pool::new(pair.pair.asset_a, pair.pair.asset_b, quote.reserve_a, quote.reserve_b, quote.fee_bps),
            );
        }
    }

    fn handle_cycle_error(&self, pair: &PairConfig, error: &BotError) {
        self.stats.lock().record_error(error.kind());
        match recovery_action(error) {
            RecoveryAction::SkipPair { reason } => {
                warn!(pair = %pair.id, kind = error.kind(), "⚠️ Skipping cycle: {}", reason);
            }
            RecoveryAction::Escalate { reason } => {
                error!(pair = %pair.id, kind = error.kind(), "❌ Pair needs attention: {}", reason);
            }
        }
    }

    /// Drives one task per pair until `shutdown` flips to true. Each task
    /// wakes on new blocks and runs its cycles strictly one after another.
    pub async fn run(self: Arc<Self>, blocks: watch::Receiver<u64>, shutdown: watch::Receiver<bool>) {
        let mut handles = Vec::with_capacity(self.config.pairs.len());
        for pair in self.config.pairs.clone() {
            let this = Arc::clone(&self);
            let blocks = blocks.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move { this.run_pair(pair, blocks, shutdown).await }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Pair task failed: {}", e);
            }
        }
        info!("🛑 All pair tasks stopped");
    }

    async fn run_pair(&self, pair: PairConfig, mut blocks: watch::Receiver<u64>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "🚀 Monitoring {} ({} <-> {})",
            pair.id, pair.first_venue.id, pair.second_venue.id
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = blocks.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let block = *blocks.borrow_and_update();
                    if let Err(e) = self.run_cycle(&pair, block).await {
                        self.handle_cycle_error(&pair, &e);
                    }
                }
            }
        }
        debug!(pair = %pair.id, "pair task stopped");
    }

    pub async fn health(&self) -> HealthStatus {
        let breaker = self.breaker.read().await;
        run_health_check(&self.feed, &self.config.pairs, &breaker, self.stats.lock().started)
    }

    /// Logs session statistics and health.
    pub async fn report(&self) {
        let health = self.health().await;
        let stats = self.stats();
        print_session_stats(&stats, &health, &self.core.stats());
    }

    /// Reports every `interval` until shutdown, then once more.
    pub async fn run_reports(self: Arc<Self>, interval: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => self.report().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        execution::{Deployment, deploy_simulation},
        settlement::Account,
        types::{AbortReason, AssetPair, USDC_MAINNET, VenueId, WETH_MAINNET},
        config::{VenueConfig, VenueKind},
    };
    use rust_decimal_macros::dec;

    const WETH: u128 = 1_000_000_000_000_000_000;
    const USDC: u128 = 1_000_000;

    fn pair_with(reserve_b_second: u128) -> PairConfig {
        let pair = AssetPair::new(WETH_MAINNET, USDC_MAINNET, 18, 6);
        PairConfig {
            id: crate::types::PairId::new("WETH/USDC"),
            pair,
            first_venue: VenueConfig {
                id: VenueId::new("alpha"),
                kind: VenueKind::Ledger { reserve_a: 100 * WETH, reserve_b: 200_000 * USDC },
                fee_bps: 30,
            },
            second_venue: VenueConfig {
                id: VenueId::new("beta"),
                kind: VenueKind::Ledger { reserve_a: 100 * WETH, reserve_b: reserve_b_second },
                fee_bps: 30,
            },
            max_position: 20_000 * USDC,
            min_liquidity: 10_000 * USDC,
            max_price_impact_bps: 2_000,
            max_slippage_bps: 50,
            max_loan: 250_000 * USDC,
            native_price: dec!(3000),
        }
    }

    fn config_for(pair: PairConfig) -> Config {
        let output = std::env::temp_dir().join(format!("atomic-arb-test-{}", uuid::Uuid::new_v4()));
        Config {
            pairs: vec![pair],
            output_dir: output.to_string_lossy().into_owned(),
            quiet_period_secs: 0,
            ..Config::default()
        }
    }

    fn deploy(config: Config) -> Deployment {
        deploy_simulation(&config, 1).unwrap()
    }

    #[tokio::test]
    async fn test_profitable_cycle_settles() {
        let pair = pair_with(250_000 * USDC);
        let deployment = deploy(config_for(pair.clone()));
        let orchestrator = deployment.orchestrator;

        let outcome = orchestrator.run_cycle(&pair, 1).await.unwrap();

        let CycleOutcome::Settled(outcome) = outcome else {
            panic!("expected settlement, got {:?}", outcome);
        };
        assert!(outcome.success, "{:?}", outcome.failure_reason);
        assert!(outcome.profit_realized > 0);
        assert_eq!(
            orchestrator.core().ledger().balance(Account::Settlement, USDC_MAINNET),
            outcome.profit_realized
        );
        let stats = orchestrator.stats();
        assert_eq!(stats.successful_settlements, 1);
        assert_eq!(stats.realized_profit, outcome.profit_realized);
    }

    #[tokio::test]
    async fn test_converged_venues_have_no_opportunity() {
        let pair = pair_with(200_500 * USDC);
        let deployment = deploy(config_for(pair.clone()));

        let outcome = deployment.orchestrator.run_cycle(&pair, 1).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::NoOpportunity));
    }

    #[tokio::test]
    async fn test_low_liquidity_is_rejected_not_counted() {
        let mut pair = pair_with(250_000 * USDC);
        // Liquidity floor above both pools: the gate must refuse.
        pair.min_liquidity = 1_000_000 * USDC;
        let deployment = deploy(config_for(pair.clone()));
        let orchestrator = deployment.orchestrator;

        let outcome = orchestrator.run_cycle(&pair, 1).await.unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::Rejected(RejectReason::InsufficientLiquidity { .. })
        ));
        assert_eq!(orchestrator.breaker().read().await.consecutive_failures(), 0);
        assert_eq!(orchestrator.stats().rejections, 1);
    }

    #[tokio::test]
    async fn test_tripped_breaker_halts_cycles() {
        let pair = pair_with(250_000 * USDC);
        let mut config = config_for(pair.clone());
        config.max_cumulative_gas_wei = 0;
        let deployment = deploy(config);
        let orchestrator = deployment.orchestrator;

        // Any settlement spends gas, which exceeds a zero ceiling.
        let first = orchestrator.run_cycle(&pair, 1).await.unwrap();
        assert!(matches!(first, CycleOutcome::Settled(_)));

        let second = orchestrator.run_cycle(&pair, 5).await.unwrap();
        assert!(matches!(second, CycleOutcome::Halted(_)));
    }

    #[tokio::test]
    async fn test_spacing_abort_is_reported() {
        let pair = pair_with(250_000 * USDC);
        let mut config = config_for(pair.clone());
        config.min_settlement_spacing_blocks = 10;
        let deployment = deploy(config);
        let orchestrator = deployment.orchestrator;

        let first = orchestrator.run_cycle(&pair, 1).await.unwrap();
        assert!(matches!(first, CycleOutcome::Settled(ref o) if o.success));

        // Restore the divergence so the next cycle sizes the same trade.
        let ledger = orchestrator.core().ledger();
        ledger.add_pool(VenueId::new("alpha"), Pool::new(WETH_MAINNET, USDC_MAINNET, 100 * WETH, 200_000 * USDC, 30));
        ledger.add_pool(VenueId::new("beta"), Pool::new(WETH_MAINNET, USDC_MAINNET, 100 * WETH, 250_000 * USDC, 30));

        let second = orchestrator.run_cycle(&pair, 2).await.unwrap();
        let CycleOutcome::Settled(outcome) = second else {
            panic!("expected settlement attempt");
        };
        assert!(matches!(outcome.failure_reason, Some(AbortReason::TooSoon { .. })));
        assert_eq!(orchestrator.breaker().read().await.consecutive_failures(), 1);
    }

    struct StalledGasOracle;

    #[async_trait::async_trait]
    impl GasOracle for StalledGasOracle {
        async fn gas_price_wei(&self) -> BotResult<u128> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_gas_oracle_times_out() {
        let pair = pair_with(250_000 * USDC);
        let config = Config {
            venue_timeout_ms: 50,
            retry_max_attempts: 2,
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 2,
            ..config_for(pair.clone())
        };
        let deployment = deploy(config.clone());
        let core = Arc::clone(deployment.orchestrator.core());
        let executor = core.authorize_executor(&deployment.operator).unwrap();
        let orchestrator = Orchestrator::new(
            config,
            Arc::clone(deployment.orchestrator.feed()),
            Arc::new(StalledGasOracle),
            core,
            executor,
        );

        let result = tokio::time::timeout(std::time::Duration::from_secs(3), orchestrator.run_cycle(&pair, 1))
            .await
            .expect("cycle must not hang on the gas oracle");

        assert!(matches!(
            result,
            Err(BotError::VenueUnavailable { ref venue, attempts: 2, .. }) if venue.as_str() == GAS_ORACLE
        ));
        assert_eq!(orchestrator.stats().settlements, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let pair = pair_with(250_000 * USDC);
        let deployment = deploy(config_for(pair));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let clock = Arc::clone(&deployment.clock);
        let task = tokio::spawn(Arc::clone(&deployment.orchestrator).run(clock.subscribe(), shutdown_rx));
        clock.tick();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(deployment.orchestrator.stats().cycles >= 1);
    }
}
