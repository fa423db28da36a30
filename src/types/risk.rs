//! Risk gate decisions

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use super::PairId;

/// First violated admission check. Variant order mirrors check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    Tripped { reason: String },
    CoolingDown { remaining: Duration },
    PositionTooLarge { input_amount: u128, max_position: u128 },
    InsufficientLiquidity { venue: String, available: u128, floor: u128 },
    PriceImpactTooHigh { impact_bps: u32, ceiling_bps: u32 },
    GasPriceTooHigh { gas_price_wei: u128, ceiling_wei: u128 },
    QuietPeriod { remaining: Duration },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Tripped { reason } => write!(f, "Tripped: {}", reason),
            RejectReason::CoolingDown { remaining } => {
                write!(f, "Cooling-Down: {}s remaining", remaining.as_secs())
            }
            RejectReason::PositionTooLarge { input_amount, max_position } => {
                write!(f, "Position too large: {} > {}", input_amount, max_position)
            }
            RejectReason::InsufficientLiquidity { venue, available, floor } => {
                write!(f, "Insufficient liquidity on {}: {} < {}", venue, available, floor)
            }
            RejectReason::PriceImpactTooHigh { impact_bps, ceiling_bps } => {
                write!(f, "Price impact too high: {} bps > {} bps", impact_bps, ceiling_bps)
            }
            RejectReason::GasPriceTooHigh { gas_price_wei, ceiling_wei } => {
                write!(f, "Gas price too high: {} wei > {} wei", gas_price_wei, ceiling_wei)
            }
            RejectReason::QuietPeriod { remaining } => {
                write!(f, "Quiet period: {}ms remaining", remaining.as_millis())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskDecision {
    pub pair_id: PairId,
    pub admit: bool,
    pub reason: Option<RejectReason>,
}

impl RiskDecision {
    pub fn admit(pair_id: PairId) -> Self {
        Self { pair_id, admit: true, reason: None }
    }

    pub fn reject(pair_id: PairId, reason: RejectReason) -> Self {
        Self { pair_id, admit: false, reason: Some(reason) }
    }
}
