//! End-to-end scenarios across feed, detector, sizer, risk gate and settlement

mod common;

use atomic_arb_bot::{
    Config,
    arbitrage::{DivergenceBounds, SizingParams, detect_opportunity, size_trade},
    feed::PriceFeed,
    network::RetryConfig,
    risk::{BreakerLimits, BreakerTransition, CircuitBreakerState, GateContext, RiskGate},
    settlement::Account,
    types::{AbortReason, RejectReason, SettlementState, USDC_MAINNET, VenueId, VenueQuote, WETH_MAINNET},
    utils::get_amount_out,
    venues::LedgerVenue,
};
use chrono::Utc;
use common::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn quote(venue: &str, reserve_a: u128, reserve_b: u128) -> VenueQuote {
    VenueQuote {
        venue: VenueId::new(venue),
        pair: weth_usdc(),
        reserve_a,
        reserve_b,
        fee_bps: 30,
        observed_block: None,
        observed_at: Utc::now(),
    }
}

fn sizing_params() -> SizingParams {
    SizingParams {
        max_position: 50_000 * USDC,
        max_loan: 250_000 * USDC,
        max_price_impact_bps: 2_000,
        lender_fee_bps: 9,
        execution_cost: 0,
        min_profit_bps: 10,
    }
}

#[tokio::test]
async fn profitable_divergence_settles_with_profit() {
    let pair = pair_config((100 * WETH, 200_000 * USDC), (100 * WETH, 250_000 * USDC));
    let h = harness(
        &[
            ("alpha", weth_usdc_pool(100 * WETH, 200_000 * USDC, 30)),
            ("beta", weth_usdc_pool(100 * WETH, 250_000 * USDC, 30)),
        ],
        250_000 * USDC,
        1,
    );

    let mut feed = PriceFeed::new(RetryConfig::default(), Duration::from_secs(1), 10);
    feed.register(Arc::new(LedgerVenue::new(VenueId::new("alpha"), h.ledger.clone())));
    feed.register(Arc::new(LedgerVenue::new(VenueId::new("beta"), h.ledger.clone())));
    let (first, second) = feed.fetch_pair(&pair).await.unwrap();

    let opp = detect_opportunity(&pair, &first, &second, &DivergenceBounds::from_config(&Config::default())).unwrap();
    assert_eq!(opp.buy_venue, VenueId::new("alpha"));
    assert_eq!(opp.divergence_pct, dec!(25));

    let trade = size_trade(&opp, &first, &second, &sizing_params()).unwrap();
    assert!(trade.expected_profit > 0);
    assert!(trade.input_amount <= 50_000 * USDC);

    let outcome = h.core.settle(
        &h.executor,
        &request(
            "alpha",
            "beta",
            trade.input_amount,
            trade.expected_intermediate,
            trade.expected_output_amount,
            50,
            10,
        ),
        context(1),
    );

    assert!(outcome.success, "{:?}", outcome.failure_reason);
    assert_eq!(outcome.reached, SettlementState::Repaid);
    // Same pools, same math: the settlement realizes exactly the sized gross profit.
    assert_eq!(outcome.profit_realized, trade.expected_profit);
    assert_eq!(h.ledger.balance(Account::Settlement, USDC_MAINNET), outcome.profit_realized);
    assert_eq!(h.ledger.balance(Account::Lender, USDC_MAINNET), 250_000 * USDC + outcome.lender_fee);
}

#[test]
fn sub_threshold_noise_is_ignored() {
    let pair = pair_config((100 * WETH, 200_000 * USDC), (100 * WETH, 200_500 * USDC));
    let first = quote("alpha", 100 * WETH, 200_000 * USDC);
    let second = quote("beta", 100 * WETH, 200_500 * USDC);

    assert!(detect_opportunity(&pair, &first, &second, &DivergenceBounds::floor(dec!(0.5))).is_none());
}

#[test]
fn slippage_abort_leaves_balances_unchanged() {
    // 130 in against 1170/1040 with no fee returns exactly 104.
    let h = harness(
        &[
            ("alpha", weth_usdc_pool(1_040, 1_170, 0)),
            ("beta", weth_usdc_pool(1_000, 1_500, 0)),
        ],
        1_000,
        1,
    );
    let before = h.ledger.snapshot();

    let outcome = h.core.settle(&h.executor, &request("alpha", "beta", 130, 110, 150, 500, 0), context(1));

    assert!(!outcome.success);
    assert_eq!(
        outcome.failure_reason,
        Some(AbortReason::ExcessiveSlippage { leg: 1, quoted: 110, min_out: 105, actual: 104 })
    );
    assert_eq!(outcome.reached, SettlementState::Borrowed);
    assert_eq!(h.ledger.snapshot(), before);
    assert_eq!(h.ledger.balance(Account::Lender, USDC_MAINNET), 1_000);
    assert_eq!(h.ledger.balance(Account::Settlement, WETH_MAINNET), 0);
}

#[test]
fn three_unprofitable_aborts_cool_the_breaker_down() {
    let h = harness(
        &[
            ("alpha", weth_usdc_pool(100 * WETH, 200_000 * USDC, 30)),
            ("beta", weth_usdc_pool(100 * WETH, 200_000 * USDC, 30)),
        ],
        250_000 * USDC,
        1,
    );
    let borrow = 1_000 * USDC;
    let leg1 = get_amount_out(borrow, 200_000 * USDC, 100 * WETH, 30);
    let leg2 = get_amount_out(leg1, 100 * WETH, 200_000 * USDC, 30);

    let limits = BreakerLimits {
        max_consecutive_failures: 3,
        cooldown: Duration::from_secs(300),
        per_trade_loss_ceiling: dec!(50),
        max_cumulative_loss: dec!(500),
        max_cumulative_gas_wei: u128::MAX,
    };
    let mut breaker = CircuitBreakerState::new();
    let start = Instant::now();

    let mut transitions = Vec::new();
    for block in 1..=3 {
        let outcome = h.core.settle(&h.executor, &request("alpha", "beta", borrow, leg1, leg2, 50, 10), context(block));
        assert!(matches!(outcome.failure_reason, Some(AbortReason::InsufficientProfit { .. })));
        transitions.push(breaker.record_outcome(&outcome, 6, &limits, start));
    }
    assert_eq!(
        transitions,
        vec![BreakerTransition::Unchanged, BreakerTransition::Unchanged, BreakerTransition::EnteredCooldown]
    );
    assert_eq!(h.core.stats().aborts.get("insufficient_profit"), Some(&3));

    // Any new trade on the pair is refused while cooling down.
    let pair = pair_config((100 * WETH, 200_000 * USDC), (100 * WETH, 250_000 * USDC));
    let buy = quote("alpha", 100 * WETH, 200_000 * USDC);
    let sell = quote("beta", 100 * WETH, 250_000 * USDC);
    let opp = detect_opportunity(&pair, &buy, &sell, &DivergenceBounds::floor(dec!(0.5))).unwrap();
    let trade = size_trade(&opp, &buy, &sell, &sizing_params()).unwrap();
    let gate = RiskGate::new(u128::MAX, Duration::ZERO);

    let ctx = GateContext { now: start, gas_price_wei: 0, buy_quote: &buy, sell_quote: &sell };
    let decision = gate.admit(&breaker, &pair, &trade, &ctx);
    assert!(!decision.admit);
    assert!(matches!(decision.reason, Some(RejectReason::CoolingDown { .. })));

    let later = GateContext { now: start + Duration::from_secs(301), ..ctx };
    assert!(gate.admit(&breaker, &pair, &trade, &later).admit);
}
