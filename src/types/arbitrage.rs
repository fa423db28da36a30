//! Arbitrage opportunity and sized trade types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::{AssetPair, PairId, VenueId};

/// Which of the pair's two configured venues is the cheaper one for asset A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArbDirection {
    BuyOnFirst,
    BuyOnSecond,
}

/// A detected cross-venue divergence. Lives for one evaluation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub pair_id: PairId,
    pub pair: AssetPair,
    pub buy_venue: VenueId,
    pub sell_venue: VenueId,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub divergence_pct: Decimal,
    pub raw_direction: ArbDirection,
}

/// An opportunity with a concrete borrow size and its advisory economics.
///
/// All amounts are raw units of the borrowed asset (asset B), except
/// `expected_intermediate` which is raw units of asset A.
#[derive(Debug, Clone, Serialize)]
pub struct SizedTrade {
    pub opportunity: ArbitrageOpportunity,
    pub input_amount: u128,
    pub expected_intermediate: u128,
    pub expected_output_amount: u128,
    pub lender_fee: u128,
    pub execution_cost: u128,
    pub expected_profit: u128,
    pub price_impact_bps: u32,
}

impl SizedTrade {
    pub fn price_impact_pct(&self) -> Decimal {
        Decimal::from(self.price_impact_bps) / Decimal::from(100)
    }
}
