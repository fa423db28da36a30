//! Normalized venue quotes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::{AssetPair, VenueId};
use crate::utils::to_units;

/// Snapshot of a constant-product venue's reserves for one pair.
///
/// Reserves are raw integer token amounts (not scaled by decimals).
/// Quotes are produced by the feed and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct VenueQuote {
    pub venue: VenueId,
    pub pair: AssetPair,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub fee_bps: u32,
    pub observed_block: Option<u64>,
    pub observed_at: DateTime<Utc>,
}

impl VenueQuote {
    /// Implied price of asset A in units of asset B, decimals-normalized.
    pub fn implied_rate(&self) -> Option<Decimal> {
        let a = to_units(self.reserve_a, self.pair.decimals_a);
        let b = to_units(self.reserve_b, self.pair.decimals_b);
        if a.is_zero() {
            return None;
        }
        b.checked_div(a)
    }

    /// Reserves ordered as (reserve of `token_in`, reserve of `token_out`).
    pub fn reserves_for(&self, direction: super::SwapDirection) -> (u128, u128) {
        match direction {
            super::SwapDirection::AToB => (self.reserve_a, self.reserve_b),
            super::SwapDirection::BToA => (self.reserve_b, self.reserve_a),
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.observed_at
    }
}
