//! Quote validation functions

use chrono::{DateTime, Utc};
use crate::{
    errors::{BotError, BotResult},
    types::{AssetPair, VenueQuote},
    utils::BPS_DENOMINATOR,
};

/// Rejects quotes the detector must not act on: wrong pair, empty pool,
/// nonsensical fee, or older than `max_age_secs`.
pub fn validate_quote(
    quote: &VenueQuote,
    pair: &AssetPair,
    now: DateTime<Utc>,
    max_age_secs: u64,
) -> BotResult<()> {
    if quote.pair != *pair {
        return Err(BotError::InvalidQuote {
            venue: quote.venue.clone(),
            reason: "quote is for a different pair".to_string(),
        });
    }

    if quote.reserve_a == 0 || quote.reserve_b == 0 {
        return Err(BotError::InvalidQuote {
            venue: quote.venue.clone(),
            reason: format!("zero reserves ({} / {})", quote.reserve_a, quote.reserve_b),
        });
    }

    if quote.fee_bps >= BPS_DENOMINATOR {
        return Err(BotError::InvalidQuote {
            venue: quote.venue.clone(),
            reason: format!("fee {} bps is not below 100%", quote.fee_bps),
        });
    }

    let age = quote.age(now);
    if age > chrono::Duration::seconds(max_age_secs as i64) {
        return Err(BotError::StaleData {
            venue: quote.venue.clone(),
            age_secs: age.num_seconds(),
            max_age_secs,
        });
    }

    Ok(())
}
