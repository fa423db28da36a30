//! Liquidity venue adapters and gas price sources

pub mod ledger;
pub mod onchain;
pub mod gas;

pub use ledger::*;
pub use onchain::*;
pub use gas::*;

use async_trait::async_trait;
use crate::{
    errors::BotResult,
    types::{AssetPair, SwapDirection, VenueId, VenueQuote},
    utils::get_amount_out,
};

/// Price/trade interface of an external liquidity venue.
///
/// Implementations report transport problems as transient errors
/// (`BotError::Network`) and rejected requests as permanent ones
/// (`BotError::Venue`); the feed retries only the former.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    fn venue_id(&self) -> &VenueId;

    async fn get_quote(&self, pair: &AssetPair) -> BotResult<VenueQuote>;

    async fn estimate_output(&self, pair: &AssetPair, direction: SwapDirection, amount_in: u128) -> BotResult<u128> {
        let quote = self.get_quote(pair).await?;
        let (reserve_in, reserve_out) = quote.reserves_for(direction);
        Ok(get_amount_out(amount_in, reserve_in, reserve_out, quote.fee_bps))
    }

    async fn execute_trade(
        &self,
        pair: &AssetPair,
        direction: SwapDirection,
        amount_in: u128,
        min_amount_out: u128,
        deadline_block: u64,
    ) -> BotResult<u128>;
}
