//! Profit-maximizing position sizing
//!
//! Net profit of borrowing `x` of asset B is
//! `leg2(leg1(x)) - x - lender_fee(x) - execution_cost`, which is concave in
//! `x` for constant-product venues. The optimum is located with an integer
//! ternary search over the capped range and finished with a linear scan.

use rust_decimal::prelude::*;
use crate::{
    types::{ArbitrageOpportunity, SizedTrade, SwapDirection, VenueQuote},
    utils::{fee_on, get_amount_out, meets_bps_ratio, pow10, price_impact_bps, to_units},
};

/// Width below which the search switches to scanning every candidate.
const LINEAR_SCAN_WIDTH: u128 = 64;

#[derive(Debug, Clone, Copy)]
pub struct SizingParams {
    pub max_position: u128,
    pub max_loan: u128,
    pub max_price_impact_bps: u32,
    pub lender_fee_bps: u32,
    pub execution_cost: u128,
    pub min_profit_bps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Evaluation {
    input: u128,
    intermediate: u128,
    output: u128,
    lender_fee: u128,
    net_profit: i128,
    impact_bps: u32,
}

/// Both legs' pools, oriented for the borrow-B / buy-A / sell-A route.
#[derive(Debug, Clone, Copy)]
struct Route {
    leg1_in: u128,
    leg1_out: u128,
    leg1_fee_bps: u32,
    leg2_in: u128,
    leg2_out: u128,
    leg2_fee_bps: u32,
}

impl Route {
    fn new(buy: &VenueQuote, sell: &VenueQuote) -> Self {
        let (leg1_in, leg1_out) = buy.reserves_for(SwapDirection::BToA);
        let (leg2_in, leg2_out) = sell.reserves_for(SwapDirection::AToB);
        Self {
            leg1_in,
            leg1_out,
            leg1_fee_bps: buy.fee_bps,
            leg2_in,
            leg2_out,
            leg2_fee_bps: sell.fee_bps,
        }
    }

    fn leg1(&self, amount: u128) -> u128 {
        get_amount_out(amount, self.leg1_in, self.leg1_out, self.leg1_fee_bps)
    }

    fn leg2(&self, amount: u128) -> u128 {
        get_amount_out(amount, self.leg2_in, self.leg2_out, self.leg2_fee_bps)
    }

    /// Worse of the two legs' price impacts.
    fn impact_bps(&self, amount: u128) -> u32 {
        let intermediate = self.leg1(amount);
        price_impact_bps(amount, self.leg1_in).max(price_impact_bps(intermediate, self.leg2_in))
    }

    fn evaluate(&self, amount: u128, params: &SizingParams) -> Evaluation {
        let intermediate = self.leg1(amount);
        let output = self.leg2(intermediate);
        let lender_fee = fee_on(amount, params.lender_fee_bps);
        let net_profit = saturating_i128(output)
            - saturating_i128(amount)
            - saturating_i128(lender_fee)
            - saturating_i128(params.execution_cost);
        Evaluation {
            input: amount,
            intermediate,
            output,
            lender_fee,
            net_profit,
            impact_bps: price_impact_bps(amount, self.leg1_in).max(price_impact_bps(intermediate, self.leg2_in)),
        }
    }
}

fn saturating_i128(value: u128) -> i128 {
    i128::try_from(value).unwrap_or(i128::MAX / 4)
}

/// Largest amount in `[0, upper]` whose worst-leg price impact stays within
/// the ceiling. Impact is monotone in size, so a binary search suffices.
fn liquidity_cap(route: &Route, upper: u128, ceiling_bps: u32) -> u128 {
    if route.impact_bps(upper) <= ceiling_bps {
        return upper;
    }
    let (mut lo, mut hi) = (0u128, upper);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if route.impact_bps(mid) <= ceiling_bps {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

fn search(route: &Route, cap: u128, params: &SizingParams) -> Evaluation {
    let (mut lo, mut hi) = (1u128, cap);
    while hi - lo > LINEAR_SCAN_WIDTH {
        let third = (hi - lo) / 3;
        let m1 = lo + third;
        let m2 = hi - third;
        if route.evaluate(m1, params).net_profit < route.evaluate(m2, params).net_profit {
            lo = m1 + 1;
        } else {
            hi = m2 - 1;
        }
    }

    let mut best = route.evaluate(lo, params);
    for amount in lo + 1..=hi {
        let candidate = route.evaluate(amount, params);
        if candidate.net_profit > best.net_profit {
            best = candidate;
        }
    }
    best
}

/// Sizes `opportunity` against the venues' current depth. `buy` and `sell`
/// must be the quotes of the opportunity's buy and sell venues.
///
/// Returns `None` when no size in the capped range clears a positive net
/// profit and the minimum profit ratio; that is a normal outcome.
pub fn size_trade(
    opportunity: &ArbitrageOpportunity,
    buy: &VenueQuote,
    sell: &VenueQuote,
    params: &SizingParams,
) -> Option<SizedTrade> {
    if buy.venue != opportunity.buy_venue || sell.venue != opportunity.sell_venue {
        return None;
    }

    let route = Route::new(buy, sell);
    let upper = params.max_position.min(params.max_loan);
    let cap = liquidity_cap(&route, upper, params.max_price_impact_bps);
    if cap == 0 {
        return None;
    }

    let best = search(&route, cap, params);
    if best.net_profit <= 0 {
        return None;
    }

    let owed = best.input.checked_add(best.lender_fee)?;
    if best.output <= owed || !meets_bps_ratio(best.output - owed, owed, params.min_profit_bps) {
        return None;
    }

    Some(SizedTrade {
        opportunity: opportunity.clone(),
        input_amount: best.input,
        expected_intermediate: best.intermediate,
        expected_output_amount: best.output,
        lender_fee: best.lender_fee,
        execution_cost: params.execution_cost,
        expected_profit: u128::try_from(best.net_profit).ok()?,
        price_impact_bps: best.impact_bps,
    })
}

/// Gas cost of one settlement in raw units of the borrowed asset, rounded up.
/// `native_price` is whole borrowed-asset units per native gas token.
pub fn estimate_execution_cost(
    gas_price_wei: u128,
    gas_per_settlement: u64,
    native_price: Decimal,
    borrowed_decimals: u32,
) -> u128 {
    let gas_wei = gas_price_wei.saturating_mul(gas_per_settlement as u128);
    let native_units = to_units(gas_wei, 18);
    native_units
        .checked_mul(native_price)
        .and_then(|cost| cost.checked_mul(pow10(borrowed_decimals as i32)))
        .and_then(|raw| raw.ceil().to_u128())
        .unwrap_or(u128::MAX)
}
