//! Error classification and recovery strategies

use super::BotError;

/// How an error should be treated by callers that may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeouts and temporary unavailability; worth retrying with backoff.
    Transient,
    /// Data too old to act on; skip this cycle.
    Stale,
    /// Will not succeed on retry.
    Permanent,
}

/// What the orchestrator does with a failed pair cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Skip the pair for this tick and try again on the next one.
    SkipPair { reason: String },
    /// Something is misconfigured or broken; report loudly and keep skipping.
    Escalate { reason: String },
}

impl BotError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BotError::Network { .. } => ErrorClass::Transient,
            BotError::VenueUnavailable { .. } => ErrorClass::Transient,
            BotError::StaleData { .. } => ErrorClass::Stale,
            BotError::InvalidQuote { .. } => ErrorClass::Stale,
            BotError::Venue { .. } => ErrorClass::Permanent,
            BotError::Contract { .. } => ErrorClass::Transient,
            BotError::InsufficientLiquidity { .. } => ErrorClass::Permanent,
            BotError::Config { .. } => ErrorClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Short stable label used for error counters.
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Network { .. } => "network",
            BotError::VenueUnavailable { .. } => "venue_unavailable",
            BotError::StaleData { .. } => "stale_data",
            BotError::InvalidQuote { .. } => "invalid_quote",
            BotError::Venue { .. } => "venue",
            BotError::Contract { .. } => "contract",
            BotError::InsufficientLiquidity { .. } => "low_liquidity",
            BotError::Config { .. } => "config",
        }
    }
}

pub fn recovery_action(error: &BotError) -> RecoveryAction {
    match error {
        BotError::Config { .. } | BotError::Venue { .. } => RecoveryAction::Escalate {
            reason: error.to_string(),
        },
        _ => RecoveryAction::SkipPair {
            reason: error.to_string(),
        },
    }
}
