//! Atomic Arbitrage Bot - two-venue flash-loan arbitrage with atomic settlement
//!
//! Watches a configured pair on two constant-product venues, sizes the
//! borrow that maximizes net profit, runs it past a risk gate and settles it
//! as one all-or-nothing unit: borrow, buy, sell, verify profit, repay.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod venues;
pub mod feed;
pub mod arbitrage;
pub mod risk;
pub mod settlement;
pub mod execution;
pub mod validation;
pub mod utils;
pub mod storage;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{BotError, BotResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
