//! Validation functions for quotes and liquidity

pub mod quote;
pub mod liquidity;

pub use quote::*;
pub use liquidity::*;
