//! Atomic settlement request/outcome types

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use super::{PairId, VenueId};

/// Immutable input for one settlement attempt.
///
/// `expected_leg1_out` / `expected_leg2_out` are the quoted outputs the
/// slippage bounds are measured against.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementRequest {
    pub pair_id: PairId,
    pub asset: Address,
    pub borrow_amount: u128,
    pub intermediate_asset: Address,
    pub buy_venue: VenueId,
    pub sell_venue: VenueId,
    pub expected_leg1_out: u128,
    pub expected_leg2_out: u128,
    pub min_acceptable_profit_bps: u32,
    pub max_slippage_bps: u32,
    pub max_price_deviation_bps: u32,
    pub deadline_block: u64,
}

/// Environment of one invocation: the current block and the execution cost
/// that is paid whether or not the settlement commits.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettlementContext {
    pub block: u64,
    pub execution_cost: u128,
    pub gas_spent_wei: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettlementState {
    Requested,
    Borrowed,
    Leg1Executed,
    Leg2Executed,
    ProfitVerified,
    Repaid,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AbortReason {
    Unauthorized,
    Paused,
    TooSoon { last_block: u64, min_spacing: u64 },
    DeadlineExpired { deadline_block: u64 },
    PriceDeviation { deviation_bps: u128, max_bps: u32 },
    UnknownVenue { venue: String },
    LenderLiquidity { requested: u128, available: u128 },
    ExcessiveSlippage { leg: u8, quoted: u128, min_out: u128, actual: u128 },
    InsufficientProfit { final_amount: u128, owed: u128, min_profit_bps: u32 },
    RepaymentShortfall { owed: u128, available: u128 },
    InvalidRequest { reason: String },
}

impl AbortReason {
    /// Stable label used for abort counters and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AbortReason::Unauthorized => "unauthorized",
            AbortReason::Paused => "paused",
            AbortReason::TooSoon { .. } => "too_soon",
            AbortReason::DeadlineExpired { .. } => "deadline_expired",
            AbortReason::PriceDeviation { .. } => "price_deviation",
            AbortReason::UnknownVenue { .. } => "unknown_venue",
            AbortReason::LenderLiquidity { .. } => "lender_liquidity",
            AbortReason::ExcessiveSlippage { .. } => "excessive_slippage",
            AbortReason::InsufficientProfit { .. } => "insufficient_profit",
            AbortReason::RepaymentShortfall { .. } => "repayment_shortfall",
            AbortReason::InvalidRequest { .. } => "invalid_request",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Unauthorized => write!(f, "Unauthorized caller"),
            AbortReason::Paused => write!(f, "Settlement paused"),
            AbortReason::TooSoon { last_block, min_spacing } => {
                write!(f, "Too soon: last settlement at block {} (min spacing {})", last_block, min_spacing)
            }
            AbortReason::DeadlineExpired { deadline_block } => {
                write!(f, "Deadline expired at block {}", deadline_block)
            }
            AbortReason::PriceDeviation { deviation_bps, max_bps } => {
                write!(f, "PriceDeviation: {} bps > {} bps", deviation_bps, max_bps)
            }
            AbortReason::UnknownVenue { venue } => write!(f, "Unknown venue {}", venue),
            AbortReason::LenderLiquidity { requested, available } => {
                write!(f, "Lender liquidity: requested {} available {}", requested, available)
            }
            AbortReason::ExcessiveSlippage { leg, quoted, min_out, actual } => write!(
                f,
                "ExcessiveSlippage on leg {}: quoted {} min {} actual {}",
                leg, quoted, min_out, actual
            ),
            AbortReason::InsufficientProfit { final_amount, owed, min_profit_bps } => write!(
                f,
                "InsufficientProfit: final {} owed {} (min {} bps)",
                final_amount, owed, min_profit_bps
            ),
            AbortReason::RepaymentShortfall { owed, available } => {
                write!(f, "Repayment shortfall: owed {} available {}", owed, available)
            }
            AbortReason::InvalidRequest { reason } => write!(f, "Invalid request: {}", reason),
        }
    }
}

/// Result of one settlement invocation.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub id: String,
    pub pair_id: PairId,
    pub timestamp: DateTime<Utc>,
    pub block: u64,
    pub success: bool,
    /// Last state reached before committing or aborting.
    pub reached: SettlementState,
    pub borrow_amount: u128,
    pub lender_fee: u128,
    pub profit_realized: u128,
    pub gas_or_fee_cost: u128,
    pub gas_spent_wei: u128,
    pub failure_reason: Option<AbortReason>,
}
