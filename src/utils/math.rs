//! Integer AMM math and basis-point helpers
//!
//! Amounts are raw token units (`u128`); intermediate products are widened to
//! `U256` so that `amount * reserve * fee` cannot overflow.

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

pub const BPS_DENOMINATOR: u32 = 10_000;

/// Fixed-point scale for stored price ratios.
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

pub fn pow10(n: i32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => {
            let mut result = dec!(1);
            if n > 0 {
                for _ in 0..n {
                    result *= dec!(10);
                }
            } else {
                for _ in 0..(-n) {
                    result /= dec!(10);
                }
            }
            result
        }
    }
}

/// Raw token amount to whole units. Saturates at `Decimal::MAX` when the
/// amount does not fit, which only makes loss accounting more conservative.
pub fn to_units(raw: u128, decimals: u32) -> Decimal {
    let Ok(signed) = i128::try_from(raw) else {
        return Decimal::MAX;
    };
    if decimals <= 28 {
        if let Ok(value) = Decimal::try_from_i128_with_scale(signed, decimals) {
            return value;
        }
    }
    match Decimal::from_i128(signed) {
        Some(value) => value / pow10(decimals as i32),
        None => Decimal::MAX,
    }
}

/// Whole units to raw token amount, truncating sub-unit dust.
pub fn from_units(units: Decimal, decimals: u32) -> Option<u128> {
    if units.is_sign_negative() {
        return None;
    }
    units.checked_mul(pow10(decimals as i32))?.trunc().to_u128()
}

fn narrow(value: U256) -> Option<u128> {
    u128::try_from(value).ok()
}

/// `a * b / denominator`, rounded up.
pub fn mul_div_ceil(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let numerator = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let quotient = numerator / denominator;
    let rounded = if numerator % denominator == U256::ZERO {
        quotient
    } else {
        quotient + U256::from(1u8)
    };
    narrow(rounded)
}

/// Constant-product output for `amount_in`, fee taken on the input side:
/// `out = in * (10000 - fee) * r_out / (r_in * 10000 + in * (10000 - fee))`.
/// Rounds down, as the pool does.
pub fn get_amount_out(amount_in: u128, reserve_in: u128, reserve_out: u128, fee_bps: u32) -> u128 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 || fee_bps >= BPS_DENOMINATOR {
        return 0;
    }
    let fee_factor = U256::from(BPS_DENOMINATOR - fee_bps);
    let amount_in_with_fee = U256::from(amount_in) * fee_factor;
    let Some(numerator) = amount_in_with_fee.checked_mul(U256::from(reserve_out)) else {
        return 0;
    };
    let denominator = U256::from(reserve_in) * U256::from(BPS_DENOMINATOR) + amount_in_with_fee;
    narrow(numerator / denominator).unwrap_or(0)
}

/// Price impact of selling `amount_in` into a pool, `in / (r_in + in)`,
/// in basis points rounded up.
pub fn price_impact_bps(amount_in: u128, reserve_in: u128) -> u32 {
    if amount_in == 0 {
        return 0;
    }
    let denominator = reserve_in.saturating_add(amount_in);
    mul_div_ceil(amount_in, BPS_DENOMINATOR as u128, denominator)
        .map(|bps| bps.min(BPS_DENOMINATOR as u128) as u32)
        .unwrap_or(BPS_DENOMINATOR)
}

/// Minimum acceptable output for a quote under a slippage tolerance.
/// Rounded up so the bound is never looser than `bps` allows.
pub fn slippage_floor(quoted: u128, max_slippage_bps: u32) -> u128 {
    let keep = BPS_DENOMINATOR.saturating_sub(max_slippage_bps) as u128;
    mul_div_ceil(quoted, keep, BPS_DENOMINATOR as u128).unwrap_or(u128::MAX)
}

/// Fee owed on a loan, rounded up in the lender's favor.
pub fn fee_on(amount: u128, fee_bps: u32) -> u128 {
    mul_div_ceil(amount, fee_bps as u128, BPS_DENOMINATOR as u128).unwrap_or(u128::MAX)
}

/// `profit / base >= min_bps / 10000`, evaluated exactly in integers.
pub fn meets_bps_ratio(profit: u128, base: u128, min_bps: u32) -> bool {
    U256::from(profit) * U256::from(BPS_DENOMINATOR) >= U256::from(base) * U256::from(min_bps)
}

/// Ratio `quote_reserve / base_reserve` scaled by [`PRICE_SCALE`].
pub fn price_x18(base_reserve: u128, quote_reserve: u128) -> Option<U256> {
    if base_reserve == 0 {
        return None;
    }
    Some(U256::from(quote_reserve) * U256::from(PRICE_SCALE) / U256::from(base_reserve))
}

/// `|current - reference| / reference` in basis points, rounded up.
pub fn deviation_bps(reference: U256, current: U256) -> u128 {
    if reference == U256::ZERO {
        return u128::MAX;
    }
    let diff = if current > reference { current - reference } else { reference - current };
    let scaled = diff * U256::from(BPS_DENOMINATOR);
    let mut bps = scaled / reference;
    if scaled % reference != U256::ZERO {
        bps += U256::from(1u8);
    }
    narrow(bps).unwrap_or(u128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_out_matches_constant_product() {
        // 100 in, 1000:2000 reserves, 0.3% fee -> ~181.32
        let out = get_amount_out(100, 1000, 2000, 30);
        assert_eq!(out, 181);
    }

    #[test]
    fn test_amount_out_zero_inputs() {
        assert_eq!(get_amount_out(0, 1000, 2000, 30), 0);
        assert_eq!(get_amount_out(100, 0, 2000, 30), 0);
        assert_eq!(get_amount_out(100, 1000, 2000, 10_000), 0);
    }

    #[test]
    fn test_amount_out_has_diminishing_returns() {
        let small = get_amount_out(1_000, 1_000_000, 1_000_000, 30);
        let large = get_amount_out(100_000, 1_000_000, 1_000_000, 30);
        assert!(large * 1_000 < small * 100_000);
    }

    #[test]
    fn test_slippage_floor_rounds_up() {
        // 110 * 0.95 = 104.5 -> 105, so 104 must fail the bound
        assert_eq!(slippage_floor(110, 500), 105);
        assert_eq!(slippage_floor(100, 500), 95);
        assert_eq!(slippage_floor(100, 0), 100);
    }

    #[test]
    fn test_fee_rounds_in_lender_favor() {
        assert_eq!(fee_on(10_000, 9), 9);
        assert_eq!(fee_on(10_001, 9), 10);
        assert_eq!(fee_on(1, 9), 1);
        assert_eq!(fee_on(0, 9), 0);
    }

    #[test]
    fn test_meets_bps_ratio_is_exact() {
        assert!(meets_bps_ratio(10, 1_000, 100));
        assert!(!meets_bps_ratio(9, 1_000, 100));
        assert!(meets_bps_ratio(0, 1_000, 0));
    }

    #[test]
    fn test_price_impact() {
        assert_eq!(price_impact_bps(0, 1_000), 0);
        // 100 / 1100 = 9.09% -> 910 bps rounded up
        assert_eq!(price_impact_bps(100, 1_000), 910);
    }

    #[test]
    fn test_deviation_bps() {
        let reference = price_x18(100, 200_000).unwrap();
        let current = price_x18(100, 202_000).unwrap();
        assert_eq!(deviation_bps(reference, current), 100);
        assert_eq!(deviation_bps(reference, reference), 0);
    }

    #[test]
    fn test_units_conversion() {
        assert_eq!(to_units(1_500_000, 6), dec!(1.5));
        assert_eq!(from_units(dec!(1.5), 6), Some(1_500_000));
        assert_eq!(from_units(dec!(-1), 6), None);
        assert_eq!(to_units(2_000_000_000_000_000_000, 18), dec!(2));
    }
}
