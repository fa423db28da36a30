//! Health monitoring types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use super::PairId;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Time of the last successful quote fetch per pair.
    pub last_quote: BTreeMap<PairId, DateTime<Utc>>,
    pub stale_pairs: Vec<PairId>,
    pub breaker: String,
    pub consecutive_failures: u32,
    pub uptime_seconds: u64,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.stale_pairs.is_empty() && self.breaker == "Armed"
    }
}
