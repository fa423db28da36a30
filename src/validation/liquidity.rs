//! Liquidity validation functions

use crate::types::VenueQuote;

/// Borrowed-asset depth a venue offers, used against the pair's liquidity floor.
pub fn available_liquidity(quote: &VenueQuote) -> u128 {
    quote.reserve_b
}
