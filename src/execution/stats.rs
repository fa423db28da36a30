//! Per-session counters reported on shutdown

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started: Instant,
    pub cycles: u64,
    pub opportunities: u64,
    pub unprofitable: u64,
    pub rejections: u64,
    pub settlements: u64,
    pub successful_settlements: u64,
    /// Raw units of each pair's borrowed asset, summed across pairs.
    pub realized_profit: u128,
    pub error_counts: HashMap<String, u32>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            cycles: 0,
            opportunities: 0,
            unprofitable: 0,
            rejections: 0,
            settlements: 0,
            successful_settlements: 0,
            realized_profit: 0,
            error_counts: HashMap::new(),
        }
    }

    pub fn record_error(&mut self, kind: &str) {
        *self.error_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn settlement_success_rate(&self) -> f64 {
        if self.settlements == 0 {
            0.0
        } else {
            self.successful_settlements as f64 / self.settlements as f64 * 100.0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
