//! Price/liquidity feed: bounded-retry quote fetching and normalization

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::{
    config::PairConfig,
    errors::{BotError, BotResult},
    network::{RetryConfig, retry_with_backoff},
    types::{AssetPair, PairId, VenueId, VenueQuote},
    validation::validate_quote,
    venues::VenueAdapter,
};

pub struct PriceFeed {
    venues: HashMap<VenueId, Arc<dyn VenueAdapter>>,
    retry: RetryConfig,
    attempt_timeout: Duration,
    max_age_secs: u64,
    last_success: Mutex<HashMap<PairId, DateTime<Utc>>>,
}

impl PriceFeed {
    pub fn new(retry: RetryConfig, attempt_timeout: Duration, max_age_secs: u64) -> Self {
        Self {
            venues: HashMap::new(),
            retry,
            attempt_timeout,
            max_age_secs,
            last_success: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&mut self, venue: Arc<dyn VenueAdapter>) {
        self.venues.insert(venue.venue_id().clone(), venue);
    }

    pub fn venue(&self, id: &VenueId) -> Option<Arc<dyn VenueAdapter>> {
        self.venues.get(id).cloned()
    }

    /// Fetches one venue's quote with bounded retries and validates it.
    ///
    /// Transient failures are retried with backoff; exhaustion or a timeout on
    /// the last attempt yields `VenueUnavailable`. Quotes older than the
    /// staleness bound yield `StaleData`.
    pub async fn fetch_quote(&self, venue_id: &VenueId, pair: &AssetPair) -> BotResult<VenueQuote> {
        let venue = self.venue(venue_id).ok_or_else(|| BotError::Venue {
            venue: venue_id.clone(),
            message: "venue not registered with the feed".to_string(),
        })?;

        let quote = retry_with_backoff(|| venue.get_quote(pair), &self.retry, venue_id, self.attempt_timeout).await?;
        validate_quote(&quote, pair, Utc::now(), self.max_age_secs)?;

        debug!(
            venue = %venue_id,
            reserve_a = quote.reserve_a,
            reserve_b = quote.reserve_b,
            block = ?quote.observed_block,
            "quote fetched"
        );
        Ok(quote)
    }

    /// Both venues' quotes for a pair, fetched concurrently so they are
    /// sampled as close together as possible.
    pub async fn fetch_pair(&self, pair: &PairConfig) -> BotResult<(VenueQuote, VenueQuote)> {
        let (first, second) = tokio::join!(
            self.fetch_quote(&pair.first_venue.id, &pair.pair),
            self.fetch_quote(&pair.second_venue.id, &pair.pair),
        );
        let quotes = (first?, second?);
        self.last_success.lock().insert(pair.id.clone(), Utc::now());
        Ok(quotes)
    }

    pub fn last_success(&self, pair: &PairId) -> Option<DateTime<Utc>> {
        self.last_success.lock().get(pair).copied()
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::{SwapDirection, USDC_MAINNET, WETH_MAINNET},
        venues::VenueAdapter,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a transient error `failures` times, then quotes.
    struct FlakyVenue {
        id: VenueId,
        failures: u32,
        calls: AtomicU32,
        age_secs: i64,
    }

    impl FlakyVenue {
        fn new(name: &str, failures: u32) -> Self {
            Self { id: VenueId::new(name), failures, calls: AtomicU32::new(0), age_secs: 0 }
        }
    }

    #[async_trait]
    impl VenueAdapter for FlakyVenue {
        fn venue_id(&self) -> &VenueId {
            &self.id
        }

        async fn get_quote(&self, pair: &AssetPair) -> BotResult<VenueQuote> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(BotError::network("connection reset"));
            }
            Ok(VenueQuote {
                venue: self.id.clone(),
                pair: *pair,
                reserve_a: 100,
                reserve_b: 200_000,
                fee_bps: 30,
                observed_block: None,
                observed_at: Utc::now() - chrono::Duration::seconds(self.age_secs),
            })
        }

        async fn execute_trade(&self, _: &AssetPair, _: SwapDirection, _: u128, _: u128, _: u64) -> BotResult<u128> {
            Err(BotError::Venue { venue: self.id.clone(), message: "read-only".to_string() })
        }
    }

    fn feed_with(venue: FlakyVenue) -> PriceFeed {
        let mut feed = PriceFeed::new(
            RetryConfig { max_attempts: 3, initial_delay_ms: 1, max_delay_ms: 2, exponential_base: 2.0 },
            Duration::from_secs(1),
            10,
        );
        feed.register(Arc::new(venue));
        feed
    }

    fn pair() -> AssetPair {
        AssetPair::new(WETH_MAINNET, USDC_MAINNET, 18, 6)
    }

    #[tokio::test]
    async fn test_recovers_from_transient_errors() {
        let feed = feed_with(FlakyVenue::new("v", 2));
        let quote = feed.fetch_quote(&VenueId::new("v"), &pair()).await.unwrap();
        assert_eq!(quote.reserve_b, 200_000);
    }

    #[tokio::test]
    async fn test_surfaces_venue_unavailable_after_budget() {
        let feed = feed_with(FlakyVenue::new("v", 10));
        let err = feed.fetch_quote(&VenueId::new("v"), &pair()).await.unwrap_err();
        assert!(matches!(err, BotError::VenueUnavailable { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_stale_quote_surfaces_stale_data() {
        let mut venue = FlakyVenue::new("v", 0);
        venue.age_secs = 60;
        let feed = feed_with(venue);
        let err = feed.fetch_quote(&VenueId::new("v"), &pair()).await.unwrap_err();
        assert!(matches!(err, BotError::StaleData { .. }));
    }

    #[tokio::test]
    async fn test_unknown_venue_is_permanent() {
        let feed = feed_with(FlakyVenue::new("v", 0));
        let err = feed.fetch_quote(&VenueId::new("other"), &pair()).await.unwrap_err();
        assert!(matches!(err, BotError::Venue { .. }));
    }
}
