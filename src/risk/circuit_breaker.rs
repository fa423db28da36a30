//! Process-wide circuit breaker state
//!
//! Armed -> Cooling-Down on consecutive failures or a large single loss;
//! Cooling-Down -> Armed once the cooldown elapses; Armed/Cooling-Down ->
//! Tripped when a cumulative ceiling is exceeded. Tripped only clears through
//! [`CircuitBreakerState::reset`].

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, warn};
use crate::{
    config::Config,
    types::{PairId, SettlementOutcome},
    utils::to_units,
};

pub type SharedBreaker = Arc<RwLock<CircuitBreakerState>>;

#[derive(Debug, Clone)]
pub struct BreakerLimits {
    pub max_consecutive_failures: u32,
    pub cooldown: Duration,
    /// Whole units of the borrowed asset.
    pub per_trade_loss_ceiling: Decimal,
    pub max_cumulative_loss: Decimal,
    pub max_cumulative_gas_wei: u128,
}

impl BreakerLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            cooldown: Duration::from_secs(config.circuit_breaker_cooldown_secs),
            per_trade_loss_ceiling: config.per_trade_loss_ceiling,
            max_cumulative_loss: config.max_cumulative_loss,
            max_cumulative_gas_wei: config.max_cumulative_gas_wei,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerStatus {
    Armed,
    CoolingDown { remaining: Duration },
    Tripped { reason: String },
}

impl fmt::Display for BreakerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerStatus::Armed => write!(f, "Armed"),
            BreakerStatus::CoolingDown { remaining } => write!(f, "Cooling-Down ({}s)", remaining.as_secs()),
            BreakerStatus::Tripped { reason } => write!(f, "Tripped ({})", reason),
        }
    }
}

/// What folding an outcome did to the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTransition {
    Unchanged,
    EnteredCooldown,
    Tripped,
}

#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerState {
    cumulative_loss_units: Decimal,
    cumulative_gas_spent_units: u128,
    consecutive_failures: u32,
    cooldown_until: Option<Instant>,
    tripped: Option<String>,
    last_attempt: HashMap<PairId, Instant>,
}

/// Loss of one outcome in whole borrowed-asset units: the execution cost not
/// covered by realized profit. Aborts lose their whole execution cost.
pub fn realized_loss_units(outcome: &SettlementOutcome, borrowed_decimals: u32) -> Decimal {
    let loss = if outcome.success {
        outcome.gas_or_fee_cost.saturating_sub(outcome.profit_realized)
    } else {
        outcome.gas_or_fee_cost
    };
    to_units(loss, borrowed_decimals)
}

impl CircuitBreakerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedBreaker {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn cumulative_loss_units(&self) -> Decimal {
        self.cumulative_loss_units
    }

    pub fn cumulative_gas_spent_units(&self) -> u128 {
        self.cumulative_gas_spent_units
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.cooldown_until
    }

    pub fn last_attempt(&self, pair: &PairId) -> Option<Instant> {
        self.last_attempt.get(pair).copied()
    }

    pub fn status(&self, now: Instant) -> BreakerStatus {
        if let Some(reason) = &self.tripped {
            return BreakerStatus::Tripped { reason: reason.clone() };
        }
        match self.cooldown_until {
            Some(until) if until > now => BreakerStatus::CoolingDown { remaining: until - now },
            _ => BreakerStatus::Armed,
        }
    }

    /// Marks the start of a settlement attempt on `pair` for the quiet period.
    pub fn record_attempt(&mut self, pair: &PairId, now: Instant) {
        self.last_attempt.insert(pair.clone(), now);
    }

    /// Folds one settlement outcome into the counters. Risk-gate rejections
    /// must never be passed here.
    pub fn record_outcome(
        &mut self,
        outcome: &SettlementOutcome,
        borrowed_decimals: u32,
        limits: &BreakerLimits,
        now: Instant,
    ) -> BreakerTransition {
        let loss = realized_loss_units(outcome, borrowed_decimals);
        self.cumulative_loss_units = self.cumulative_loss_units.saturating_add(loss);
        self.cumulative_gas_spent_units = self.cumulative_gas_spent_units.saturating_add(outcome.gas_spent_wei);

        if outcome.success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        if self.tripped.is_some() {
            return BreakerTransition::Unchanged;
        }

        let trip_reason = if self.cumulative_loss_units > limits.max_cumulative_loss {
            Some(format!(
                "cumulative loss {} exceeds {}",
                self.cumulative_loss_units, limits.max_cumulative_loss
            ))
        } else if self.cumulative_gas_spent_units > limits.max_cumulative_gas_wei {
            Some(format!(
                "cumulative gas {} wei exceeds {} wei",
                self.cumulative_gas_spent_units, limits.max_cumulative_gas_wei
            ))
        } else {
            None
        };
        if let Some(reason) = trip_reason {
            error!(pair = %outcome.pair_id, reason = %reason, "🛑 circuit breaker TRIPPED");
            self.tripped = Some(reason);
            return BreakerTransition::Tripped;
        }

        let too_many_failures = !outcome.success && self.consecutive_failures >= limits.max_consecutive_failures;
        let large_loss = loss > limits.per_trade_loss_ceiling;
        if too_many_failures || large_loss {
            self.cooldown_until = Some(now + limits.cooldown);
            warn!(
                pair = %outcome.pair_id,
                consecutive_failures = self.consecutive_failures,
                loss = %loss,
                cooldown_secs = limits.cooldown.as_secs(),
                "⏸️ circuit breaker cooling down"
            );
            return BreakerTransition::EnteredCooldown;
        }
        BreakerTransition::Unchanged
    }

    /// Operator reset: clears every counter and the tripped flag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
