//! Constant-product venue backed by a pool on the in-process ledger

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;
use crate::{
    errors::{BotError, BotResult},
    settlement::{Account, Ledger, LedgerError, Pool},
    types::{AssetPair, SwapDirection, VenueId, VenueQuote},
};
use super::VenueAdapter;

pub struct LedgerVenue {
    id: VenueId,
    ledger: Ledger,
    blocks: Option<watch::Receiver<u64>>,
}

impl LedgerVenue {
    pub fn new(id: VenueId, ledger: Ledger) -> Self {
        Self { id, ledger, blocks: None }
    }

    /// Registers a pool for `pair` with the given raw reserves and returns the venue.
    pub fn seed(id: VenueId, ledger: Ledger, pair: &AssetPair, reserve_a: u128, reserve_b: u128, fee_bps: u32) -> Self {
        ledger.add_pool(id.clone(), Pool::new(pair.asset_a, pair.asset_b, reserve_a, reserve_b, fee_bps));
        Self::new(id, ledger)
    }

    /// Stamps quotes with the current block and enforces trade deadlines.
    pub fn with_blocks(mut self, blocks: watch::Receiver<u64>) -> Self {
        self.blocks = Some(blocks);
        self
    }

    fn current_block(&self) -> Option<u64> {
        self.blocks.as_ref().map(|rx| *rx.borrow())
    }

    fn pool(&self) -> BotResult<Pool> {
        self.ledger.pool(&self.id).ok_or_else(|| BotError::Venue {
            venue: self.id.clone(),
            message: "no pool on ledger".to_string(),
        })
    }
}

#[async_trait]
impl VenueAdapter for LedgerVenue {
    fn venue_id(&self) -> &VenueId {
        &self.id
    }

    async fn get_quote(&self, pair: &AssetPair) -> BotResult<VenueQuote> {
        let pool = self.pool()?;
        let (Some(reserve_a), Some(reserve_b)) = (pool.reserve_of(pair.asset_a), pool.reserve_of(pair.asset_b)) else {
            return Err(BotError::Venue {
                venue: self.id.clone(),
                message: "pool does not trade this pair".to_string(),
            });
        };

        Ok(VenueQuote {
            venue: self.id.clone(),
            pair: *pair,
            reserve_a,
            reserve_b,
            fee_bps: pool.fee_bps,
            observed_block: self.current_block(),
            observed_at: Utc::now(),
        })
    }

    /// Trades from the external market account; the caller must fund it.
    async fn execute_trade(
        &self,
        pair: &AssetPair,
        direction: SwapDirection,
        amount_in: u128,
        min_amount_out: u128,
        deadline_block: u64,
    ) -> BotResult<u128> {
        if let Some(block) = self.current_block() {
            if block > deadline_block {
                return Err(BotError::Venue {
                    venue: self.id.clone(),
                    message: format!("deadline {} passed at block {}", deadline_block, block),
                });
            }
        }

        let token_in = direction.token_in(pair);
        let amount_out = self.ledger.transact(|state| {
            let out = state
                .swap(&self.id, Account::Market, token_in, amount_in)
                .map_err(|e| {
                    if matches!(e, LedgerError::ZeroOutput { .. }) {
                        BotError::InsufficientLiquidity { pool: self.id.to_string(), details: e.to_string() }
                    } else {
                        BotError::Venue { venue: self.id.clone(), message: e.to_string() }
                    }
                })?;
            if out < min_amount_out {
                return Err(BotError::Venue {
                    venue: self.id.clone(),
                    message: format!("output {} below minimum {}", out, min_amount_out),
                });
            }
            Ok(out)
        })?;

        debug!(venue = %self.id, ?direction, amount_in, amount_out, "ledger trade executed");
        Ok(amount_out)
    }
}
