//! Custom error types for the bot

use alloy::primitives::Address;
use thiserror::Error;
use crate::types::VenueId;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Venue {venue} unavailable after {attempts} attempts: {message}")]
    VenueUnavailable {
        venue: VenueId,
        message: String,
        attempts: u32,
    },

    #[error("Stale data from {venue}: quote is {age_secs}s old (max {max_age_secs}s)")]
    StaleData {
        venue: VenueId,
        age_secs: i64,
        max_age_secs: u64,
    },

    #[error("Invalid quote from {venue}: {reason}")]
    InvalidQuote {
        venue: VenueId,
        reason: String,
    },

    #[error("Venue {venue} rejected the request: {message}")]
    Venue {
        venue: VenueId,
        message: String,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Insufficient liquidity: {pool} - {details}")]
    InsufficientLiquidity {
        pool: String,
        details: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },
}

impl BotError {
    pub fn config(message: impl Into<String>) -> Self {
        BotError::Config { message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        BotError::Network {
            message: message.into(),
            source: None,
            retry_count: 0,
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
