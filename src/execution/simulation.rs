//! Simulated external market activity on ledger pools

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};
use crate::{
    settlement::{Account, Ledger},
    types::{AssetPair, SwapDirection},
    utils::BPS_DENOMINATOR,
    venues::{LedgerVenue, VenueAdapter},
};

/// Moves ledger pools with random trades from the market account so that
/// the configured venues drift apart and back together.
///
/// The market account is a pass-through: each trade's input is minted just
/// before the trade and its output burned right after, so it ends every step
/// holding nothing.
pub struct MarketSimulator {
    ledger: Ledger,
    venues: Vec<(Arc<LedgerVenue>, AssetPair)>,
    max_trade_bps: u32,
    rng: StdRng,
}

impl MarketSimulator {
    pub fn new(ledger: Ledger, max_trade_bps: u32) -> Self {
        Self::with_rng(ledger, max_trade_bps, StdRng::from_rng(&mut rand::rng()))
    }

    pub fn with_rng(ledger: Ledger, max_trade_bps: u32, rng: StdRng) -> Self {
        Self { ledger, venues: Vec::new(), max_trade_bps: max_trade_bps.min(BPS_DENOMINATOR), rng }
    }

    pub fn add_venue(&mut self, venue: Arc<LedgerVenue>, pair: AssetPair) {
        self.venues.push((venue, pair));
    }

    /// One random trade per venue. Returns the number of trades executed.
    pub async fn step(&mut self) -> usize {
        let mut executed = 0;
        for (venue, pair) in &self.venues {
            let quote = match venue.get_quote(pair).await {
                Ok(quote) => quote,
                Err(e) => {
                    warn!("⚠️ Simulator could not quote {}: {}", venue.venue_id(), e);
                    continue;
                }
            };

            let direction = if self.rng.random_bool(0.5) { SwapDirection::AToB } else { SwapDirection::BToA };
            let (reserve_in, _) = quote.reserves_for(direction);
            let max_amount = reserve_in / BPS_DENOMINATOR as u128 * self.max_trade_bps as u128;
            if max_amount == 0 {
                continue;
            }
            let amount = self.rng.random_range(1..=max_amount);

            let min_out = match venue.estimate_output(pair, direction, amount).await {
                Ok(estimate) => estimate,
                Err(e) => {
                    warn!("⚠️ Simulator could not price {}: {}", venue.venue_id(), e);
                    continue;
                }
            };

            let token_in = direction.token_in(pair);
            if let Err(e) = self.ledger.mint(Account::Market, token_in, amount) {
                warn!("⚠️ Simulator funding failed: {}", e);
                continue;
            }
            let (asset, leftover) = match venue.execute_trade(pair, direction, amount, min_out, u64::MAX).await {
                Ok(out) => {
                    executed += 1;
                    debug!(venue = %venue.venue_id(), ?direction, amount, out, "simulated market trade");
                    (direction.token_out(pair), out)
                }
                Err(e) => {
                    warn!("⚠️ Simulated trade on {} failed: {}", venue.venue_id(), e);
                    (token_in, amount)
                }
            };
            if let Err(e) = self.ledger.burn(Account::Market, asset, leftover) {
                warn!("⚠️ Simulator could not settle market account: {}", e);
            }
        }
        executed
    }

    pub async fn run(mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!("🎭 Market simulator running on {} venues", self.venues.len());
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.step().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("🎭 Market simulator stopped");
    }
}
