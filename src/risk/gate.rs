//! Pre-settlement admission checks
//!
//! [`RiskGate::admit`] is a pure function of the breaker state, the pair's
//! limits, the sized trade and the observation context: identical inputs
//! always produce an identical decision.

use std::time::{Duration, Instant};
use tracing::debug;
use crate::{
    config::{Config, PairConfig},
    types::{RejectReason, RiskDecision, SizedTrade, VenueQuote},
    validation::available_liquidity,
};
use super::circuit_breaker::{BreakerStatus, CircuitBreakerState};

/// Observations the gate needs beyond the trade itself.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub now: Instant,
    pub gas_price_wei: u128,
    pub buy_quote: &'a VenueQuote,
    pub sell_quote: &'a VenueQuote,
}

#[derive(Debug, Clone)]
pub struct RiskGate {
    max_gas_price_wei: u128,
    quiet_period: Duration,
}

impl RiskGate {
    pub fn new(max_gas_price_wei: u128, quiet_period: Duration) -> Self {
        Self { max_gas_price_wei, quiet_period }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_gas_price_wei(), Duration::from_secs(config.quiet_period_secs))
    }

    /// Checks run in order and stop at the first violation.
    pub fn admit(
        &self,
        breaker: &CircuitBreakerState,
        pair: &PairConfig,
        trade: &SizedTrade,
        ctx: &GateContext<'_>,
    ) -> RiskDecision {
        let result = self
            .check_breaker(breaker, ctx)
            .and_then(|_| self.check_position(pair, trade))
            .and_then(|_| self.check_liquidity(pair, ctx))
            .and_then(|_| self.check_price_impact(pair, trade))
            .and_then(|_| self.check_gas_price(ctx))
            .and_then(|_| self.check_quiet_period(breaker, pair, ctx));
        match result.err() {
            Some(reason) => {
                debug!(pair = %pair.id, reason = %reason, "risk gate rejected trade");
                RiskDecision::reject(pair.id.clone(), reason)
            }
            None => RiskDecision::admit(pair.id.clone()),
        }
    }

    fn check_breaker(&self, breaker: &CircuitBreakerState, ctx: &GateContext<'_>) -> Result<(), RejectReason> {
        match breaker.status(ctx.now) {
            BreakerStatus::Tripped { reason } => Err(RejectReason::Tripped { reason }),
            BreakerStatus::CoolingDown { remaining } => Err(RejectReason::CoolingDown { remaining }),
            BreakerStatus::Armed => Ok(()),
        }
    }

    fn check_position(&self, pair: &PairConfig, trade: &SizedTrade) -> Result<(), RejectReason> {
        if trade.input_amount > pair.max_position {
            return Err(RejectReason::PositionTooLarge {
                input_amount: trade.input_amount,
                max_position: pair.max_position,
            });
        }
        Ok(())
    }

    fn check_liquidity(&self, pair: &PairConfig, ctx: &GateContext<'_>) -> Result<(), RejectReason> {
        for quote in [ctx.buy_quote, ctx.sell_quote] {
            let available = available_liquidity(quote);
            if available < pair.min_liquidity {
                return Err(RejectReason::InsufficientLiquidity {
                    venue: quote.venue.to_string(),
                    available,
                    floor: pair.min_liquidity,
                });
            }
        }
        Ok(())
    }

    fn check_price_impact(&self, pair: &PairConfig, trade: &SizedTrade) -> Result<(), RejectReason> {
        if trade.price_impact_bps > pair.max_price_impact_bps {
            return Err(RejectReason::PriceImpactTooHigh {
                impact_bps: trade.price_impact_bps,
                ceiling_bps: pair.max_price_impact_bps,
            });
        }
        Ok(())
    }

    fn check_gas_price(&self, ctx: &GateContext<'_>) -> Result<(), RejectReason> {
        if ctx.gas_price_wei > self.max_gas_price_wei {
            return Err(RejectReason::GasPriceTooHigh {
                gas_price_wei: ctx.gas_price_wei,
                ceiling_wei: self.max_gas_price_wei,
            });
        }
        Ok(())
    }

    fn check_quiet_period(
        &self,
        breaker: &CircuitBreakerState,
        pair: &PairConfig,
        ctx: &GateContext<'_>,
    ) -> Result<(), RejectReason> {
        if let Some(last) = breaker.last_attempt(&pair.id) {
            let elapsed = ctx.now.saturating_duration_since(last);
            if elapsed < self.quiet_period {
                return Err(RejectReason::QuietPeriod { remaining: self.quiet_period - elapsed });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::demo_pair,
        risk::BreakerLimits,
        types::{AbortReason, ArbDirection, ArbitrageOpportunity, SettlementOutcome, SettlementState},
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote(pair: &PairConfig, reserve_b: u128) -> VenueQuote {
        VenueQuote {
            venue: pair.first_venue.id.clone(),
            pair: pair.pair,
            reserve_a: 1_000,
            reserve_b,
            fee_bps: 30,
            observed_block: None,
            observed_at: Utc::now(),
        }
    }

    fn trade(pair: &PairConfig, input_amount: u128, price_impact_bps: u32) -> SizedTrade {
        SizedTrade {
            opportunity: ArbitrageOpportunity {
                id: "o".to_string(),
                timestamp: Utc::now(),
                pair_id: pair.id.clone(),
                pair: pair.pair,
                buy_venue: pair.first_venue.id.clone(),
                sell_venue: pair.second_venue.id.clone(),
                buy_rate: dec!(2000),
                sell_rate: dec!(2500),
                divergence_pct: dec!(25),
                raw_direction: ArbDirection::BuyOnFirst,
            },
            input_amount,
            expected_intermediate: 1,
            expected_output_amount: input_amount + 10,
            lender_fee: 1,
            execution_cost: 1,
            expected_profit: 8,
            price_impact_bps,
        }
    }

    fn gate() -> RiskGate {
        RiskGate::new(50_000_000_000, Duration::from_secs(4))
    }

    fn failure(pair: &PairConfig) -> SettlementOutcome {
        SettlementOutcome {
            id: "f".to_string(),
            pair_id: pair.id.clone(),
            timestamp: Utc::now(),
            block: 1,
            success: false,
            reached: SettlementState::Leg2Executed,
            borrow_amount: 1,
            lender_fee: 0,
            profit_realized: 0,
            gas_or_fee_cost: 0,
            gas_spent_wei: 0,
            failure_reason: Some(AbortReason::InsufficientProfit { final_amount: 0, owed: 1, min_profit_bps: 10 }),
        }
    }

    #[test]
    fn test_healthy_trade_admitted() {
        let pair = demo_pair();
        let q = quote(&pair, pair.min_liquidity);
        let ctx = GateContext { now: Instant::now(), gas_price_wei: 1, buy_quote: &q, sell_quote: &q };
        let decision = gate().admit(&CircuitBreakerState::new(), &pair, &trade(&pair, 1_000, 10), &ctx);
        assert!(decision.admit);
        assert_eq!(decision.reason, None);
    }

    #[test]
    fn test_first_violation_wins() {
        let pair = demo_pair();
        let thin = quote(&pair, 1);
        let ctx = GateContext { now: Instant::now(), gas_price_wei: u128::MAX, buy_quote: &thin, sell_quote: &thin };
        let oversized = trade(&pair, pair.max_position + 1, 10_000);

        let decision = gate().admit(&CircuitBreakerState::new(), &pair, &oversized, &ctx);

        assert!(matches!(decision.reason, Some(RejectReason::PositionTooLarge { .. })));
    }

    #[test]
    fn test_each_limit_enforced() {
        let pair = demo_pair();
        let deep = quote(&pair, pair.min_liquidity);
        let thin = quote(&pair, pair.min_liquidity - 1);
        let now = Instant::now();
        let breaker = CircuitBreakerState::new();

        let ctx = GateContext { now, gas_price_wei: 1, buy_quote: &deep, sell_quote: &thin };
        let decision = gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &ctx);
        assert!(matches!(decision.reason, Some(RejectReason::InsufficientLiquidity { .. })));

        let ctx = GateContext { now, gas_price_wei: 1, buy_quote: &deep, sell_quote: &deep };
        let decision = gate().admit(&breaker, &pair, &trade(&pair, 1_000, pair.max_price_impact_bps + 1), &ctx);
        assert!(matches!(decision.reason, Some(RejectReason::PriceImpactTooHigh { .. })));

        let ctx = GateContext { now, gas_price_wei: 50_000_000_001, buy_quote: &deep, sell_quote: &deep };
        let decision = gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &ctx);
        assert!(matches!(decision.reason, Some(RejectReason::GasPriceTooHigh { .. })));
    }

    #[test]
    fn test_quiet_period_after_attempt() {
        let pair = demo_pair();
        let q = quote(&pair, pair.min_liquidity);
        let now = Instant::now();
        let mut breaker = CircuitBreakerState::new();
        breaker.record_attempt(&pair.id, now);

        let ctx = GateContext { now: now + Duration::from_secs(1), gas_price_wei: 1, buy_quote: &q, sell_quote: &q };
        let decision = gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &ctx);
        assert_eq!(decision.reason, Some(RejectReason::QuietPeriod { remaining: Duration::from_secs(3) }));

        let ctx = GateContext { now: now + Duration::from_secs(4), ..ctx };
        assert!(gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &ctx).admit);
    }

    #[test]
    fn test_cooling_down_blocks_until_elapsed() {
        let pair = demo_pair();
        let q = quote(&pair, pair.min_liquidity);
        let now = Instant::now();
        let limits = BreakerLimits {
            max_consecutive_failures: 3,
            cooldown: Duration::from_secs(300),
            per_trade_loss_ceiling: dec!(50),
            max_cumulative_loss: dec!(500),
            max_cumulative_gas_wei: u128::MAX,
        };
        let mut breaker = CircuitBreakerState::new();
        for _ in 0..3 {
            breaker.record_outcome(&failure(&pair), 6, &limits, now);
        }

        let ctx = GateContext { now, gas_price_wei: 1, buy_quote: &q, sell_quote: &q };
        let first = gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &ctx);
        let second = gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &ctx);
        assert_eq!(first, second);
        assert!(first.reason.unwrap().to_string().starts_with("Cooling-Down"));

        let later = GateContext { now: now + Duration::from_secs(301), ..ctx };
        assert!(gate().admit(&breaker, &pair, &trade(&pair, 1_000, 10), &later).admit);
    }
}
