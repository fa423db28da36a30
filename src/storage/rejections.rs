//! Risk gate rejection storage

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use crate::types::{PairId, RejectReason, SizedTrade};
use super::{append_json_line, daily_file};

#[derive(Debug, Clone, Serialize)]
pub struct RejectionRecord {
    pub timestamp: DateTime<Utc>,
    pub pair_id: PairId,
    pub opportunity_id: String,
    pub input_amount: u128,
    pub expected_profit: u128,
    pub reason: RejectReason,
    pub message: String,
}

impl RejectionRecord {
    pub fn new(trade: &SizedTrade, reason: RejectReason) -> Self {
        Self {
            timestamp: Utc::now(),
            pair_id: trade.opportunity.pair_id.clone(),
            opportunity_id: trade.opportunity.id.clone(),
            input_amount: trade.input_amount,
            expected_profit: trade.expected_profit,
            message: reason.to_string(),
            reason,
        }
    }
}

pub fn save_rejection(output_dir: &str, record: &RejectionRecord) -> Result<()> {
    let path = daily_file(output_dir, "rejections");
    append_json_line(&path, record)?;

    debug!(
        pair = %record.pair_id,
        reason = %record.message,
        "Saved risk rejection"
    );

    Ok(())
}
