//! Health monitoring utilities

use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Instant;
use crate::{
    config::PairConfig,
    feed::PriceFeed,
    risk::CircuitBreakerState,
    types::HealthStatus,
};

/// A pair is stale when it has no successful quote pair within the feed's
/// staleness bound.
pub fn run_health_check(
    feed: &PriceFeed,
    pairs: &[PairConfig],
    breaker: &CircuitBreakerState,
    start_time: Instant,
) -> HealthStatus {
    let now = Utc::now();
    let max_age = chrono::Duration::seconds(feed.max_age_secs() as i64);
    let mut last_quote = BTreeMap::new();
    let mut stale_pairs = Vec::new();

    for pair in pairs {
        match feed.last_success(&pair.id) {
            Some(at) => {
                if now - at > max_age {
                    stale_pairs.push(pair.id.clone());
                }
                last_quote.insert(pair.id.clone(), at);
            }
            None => stale_pairs.push(pair.id.clone()),
        }
    }

    HealthStatus {
        last_quote,
        stale_pairs,
        breaker: breaker.status(Instant::now()).to_string(),
        consecutive_failures: breaker.consecutive_failures(),
        uptime_seconds: start_time.elapsed().as_secs(),
    }
}
