//! Well-known asset addresses used by the built-in demo pair

use alloy::primitives::{Address, address};

// Base mainnet
pub const WETH_MAINNET: Address = address!("4200000000000000000000000000000000000006");
pub const USDC_MAINNET: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

pub const WETH_DECIMALS: u32 = 18;
pub const USDC_DECIMALS: u32 = 6;
