//! Asset pair and venue identifiers

use alloy::primitives::Address;
use serde::Serialize;
use std::fmt;

/// Identifies a liquidity venue by its configured name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VenueId(pub String);

impl VenueId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a configured pair (one detection/settlement lane).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PairId(pub String);

impl PairId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The traded pair. `asset_a` is the base (intermediate) asset, `asset_b` the
/// quote asset that gets borrowed and in which profit is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssetPair {
    pub asset_a: Address,
    pub asset_b: Address,
    pub decimals_a: u32,
    pub decimals_b: u32,
}

impl AssetPair {
    pub fn new(asset_a: Address, asset_b: Address, decimals_a: u32, decimals_b: u32) -> Self {
        Self { asset_a, asset_b, decimals_a, decimals_b }
    }

    pub fn contains(&self, asset: Address) -> bool {
        self.asset_a == asset || self.asset_b == asset
    }
}

/// Direction of a single swap on a venue, relative to the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SwapDirection {
    /// Sell asset A, receive asset B.
    AToB,
    /// Sell asset B, receive asset A.
    BToA,
}

impl SwapDirection {
    pub fn token_in(&self, pair: &AssetPair) -> Address {
        match self {
            SwapDirection::AToB => pair.asset_a,
            SwapDirection::BToA => pair.asset_b,
        }
    }

    pub fn token_out(&self, pair: &AssetPair) -> Address {
        match self {
            SwapDirection::AToB => pair.asset_b,
            SwapDirection::BToA => pair.asset_a,
        }
    }
}
