//! Cross-venue divergence detection

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::warn;
use crate::{
    config::{Config, PairConfig},
    types::{ArbDirection, ArbitrageOpportunity, VenueQuote},
};

/// `|rate_a - rate_b| / min(rate_a, rate_b)` as a percentage.
pub fn divergence_pct(rate_a: Decimal, rate_b: Decimal) -> Option<Decimal> {
    let low = rate_a.min(rate_b);
    if low <= dec!(0) {
        return None;
    }
    ((rate_a - rate_b).abs() / low).checked_mul(dec!(100))
}

/// Window of divergences worth acting on.
///
/// Below `min_pct` is measurement noise. Above either ceiling one of the
/// pools is more likely broken or manipulated than mispriced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceBounds {
    pub min_pct: Decimal,
    pub max_pct: Option<Decimal>,
    pub max_venue_deviation_pct: Option<Decimal>,
}

impl DivergenceBounds {
    /// Noise floor only, no sanity ceilings.
    pub fn floor(min_pct: Decimal) -> Self {
        Self { min_pct, max_pct: None, max_venue_deviation_pct: None }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            min_pct: config.min_divergence_pct,
            max_pct: Some(config.max_divergence_pct),
            max_venue_deviation_pct: Some(config.max_venue_deviation_pct),
        }
    }
}

/// Largest distance of either rate from their mean, as a percentage of the mean.
pub fn venue_deviation_pct(rate_a: Decimal, rate_b: Decimal) -> Option<Decimal> {
    let mean = (rate_a + rate_b) / dec!(2);
    if mean <= dec!(0) {
        return None;
    }
    let worst = (rate_a - mean).abs().max((rate_b - mean).abs());
    (worst / mean).checked_mul(dec!(100))
}

/// Compares the two venues' implied rates for the pair and emits an
/// opportunity when the divergence strictly exceeds the noise floor and
/// stays within the sanity ceilings.
///
/// Asset A is bought on the venue where it is cheaper and sold on the other.
pub fn detect_opportunity(
    pair: &PairConfig,
    first: &VenueQuote,
    second: &VenueQuote,
    bounds: &DivergenceBounds,
) -> Option<ArbitrageOpportunity> {
    if first.pair != pair.pair || second.pair != pair.pair || first.venue == second.venue {
        return None;
    }

    let first_rate = first.implied_rate()?;
    let second_rate = second.implied_rate()?;
    let divergence = divergence_pct(first_rate, second_rate)?;

    // Exclusive threshold: exactly at the floor is noise.
    if divergence <= bounds.min_pct {
        return None;
    }

    if let Some(max_pct) = bounds.max_pct {
        if divergence > max_pct {
            warn!(pair = %pair.id, divergence_pct = %divergence, max_pct = %max_pct, "⚠️ Divergence too large, ignoring pair");
            return None;
        }
    }
    if let Some(max_deviation) = bounds.max_venue_deviation_pct {
        let deviation = venue_deviation_pct(first_rate, second_rate)?;
        if deviation > max_deviation {
            warn!(pair = %pair.id, deviation_pct = %deviation, max_pct = %max_deviation, "⚠️ Venue rate too far from mean, ignoring pair");
            return None;
        }
    }

    let (direction, buy, sell) = if first_rate < second_rate {
        (ArbDirection::BuyOnFirst, first, second)
    } else {
        (ArbDirection::BuyOnSecond, second, first)
    };

    Some(ArbitrageOpportunity {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        pair_id: pair.id.clone(),
        pair: pair.pair,
        buy_venue: buy.venue.clone(),
        sell_venue: sell.venue.clone(),
        buy_rate: buy.implied_rate()?,
        sell_rate: sell.implied_rate()?,
        divergence_pct: divergence,
        raw_direction: direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::demo_pair;

    fn quote(pair: &PairConfig, first: bool, reserve_a: u128, reserve_b: u128) -> VenueQuote {
        let venue = if first { &pair.first_venue } else { &pair.second_venue };
        VenueQuote {
            venue: venue.id.clone(),
            pair: pair.pair,
            reserve_a,
            reserve_b,
            fee_bps: 30,
            observed_block: None,
            observed_at: Utc::now(),
        }
    }

    const WETH: u128 = 1_000_000_000_000_000_000;
    const USDC: u128 = 1_000_000;

    #[test]
    fn test_profitable_divergence_detected() {
        let pair = demo_pair();
        let a = quote(&pair, true, 100 * WETH, 200_000 * USDC);
        let b = quote(&pair, false, 100 * WETH, 250_000 * USDC);

        let opp = detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.5))).unwrap();

        assert_eq!(opp.divergence_pct, dec!(25));
        assert_eq!(opp.raw_direction, ArbDirection::BuyOnFirst);
        assert_eq!(opp.buy_venue, pair.first_venue.id);
        assert_eq!(opp.buy_rate, dec!(2000));
        assert_eq!(opp.sell_rate, dec!(2500));
    }

    #[test]
    fn test_direction_follows_cheaper_venue() {
        let pair = demo_pair();
        let a = quote(&pair, true, 100 * WETH, 250_000 * USDC);
        let b = quote(&pair, false, 100 * WETH, 200_000 * USDC);

        let opp = detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.5))).unwrap();
        assert_eq!(opp.raw_direction, ArbDirection::BuyOnSecond);
        assert_eq!(opp.sell_venue, pair.first_venue.id);
    }

    #[test]
    fn test_sub_threshold_noise_ignored() {
        let pair = demo_pair();
        let a = quote(&pair, true, 100 * WETH, 200_000 * USDC);
        let b = quote(&pair, false, 100 * WETH, 200_500 * USDC);
        assert!(detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.5))).is_none());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let pair = demo_pair();
        let a = quote(&pair, true, 100 * WETH, 200_000 * USDC);
        let b = quote(&pair, false, 100 * WETH, 201_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.5))).is_none());
        assert!(detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.49))).is_some());
    }

    fn sane() -> DivergenceBounds {
        DivergenceBounds::from_config(&Config::default())
    }

    #[test]
    fn test_default_ceilings_admit_quarter_divergence() {
        let pair = demo_pair();
        let a = quote(&pair, true, 100 * WETH, 200_000 * USDC);
        let b = quote(&pair, false, 100 * WETH, 250_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &b, &sane()).is_some());
    }

    #[test]
    fn test_divergence_ceiling_rejects_broken_pool() {
        let pair = demo_pair();
        let a = quote(&pair, true, 100 * WETH, 200_000 * USDC);
        // 35% apart, above the 30% default ceiling.
        let b = quote(&pair, false, 100 * WETH, 270_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &b, &sane()).is_none());
        assert!(detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.5))).is_some());

        // Exactly at the ceiling is still admitted.
        let at = quote(&pair, false, 100 * WETH, 260_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &at, &sane()).is_some());
    }

    #[test]
    fn test_venue_deviation_ceiling() {
        let pair = demo_pair();
        let bounds = DivergenceBounds { max_venue_deviation_pct: Some(dec!(10)), ..DivergenceBounds::floor(dec!(0.5)) };
        let a = quote(&pair, true, 100 * WETH, 200_000 * USDC);

        // 2000 vs 2500: mean 2250, each side 11.1% away.
        let far = quote(&pair, false, 100 * WETH, 250_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &far, &bounds).is_none());

        // 2000 vs 2400: mean 2200, each side 9.1% away.
        let near = quote(&pair, false, 100 * WETH, 240_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &near, &bounds).is_some());
    }

    #[test]
    fn test_venue_deviation_pct() {
        assert_eq!(venue_deviation_pct(dec!(90), dec!(110)), Some(dec!(10)));
        assert_eq!(venue_deviation_pct(dec!(0), dec!(0)), None);
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let pair = demo_pair();
        let a = quote(&pair, true, 0, 200_000 * USDC);
        let b = quote(&pair, false, 100 * WETH, 250_000 * USDC);
        assert!(detect_opportunity(&pair, &a, &b, &DivergenceBounds::floor(dec!(0.5))).is_none());
    }
}
