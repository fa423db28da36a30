//! Settlement outcome storage

use anyhow::Result;
use tracing::debug;
use crate::types::SettlementOutcome;
use super::{append_json_line, daily_file};

pub fn save_settlement_outcome(output_dir: &str, outcome: &SettlementOutcome) -> Result<()> {
    let path = daily_file(output_dir, "settlements");
    append_json_line(&path, outcome)?;

    debug!(
        outcome_id = %outcome.id,
        pair = %outcome.pair_id,
        success = outcome.success,
        profit = outcome.profit_realized,
        "Saved settlement outcome"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PairId, SettlementState};
    use chrono::Utc;

    #[test]
    fn test_outcomes_append_one_line_each() {
        let dir = std::env::temp_dir().join(format!("atomic-arb-{}", uuid::Uuid::new_v4()));
        let dir = dir.to_string_lossy().to_string();
        let outcome = SettlementOutcome {
            id: "s1".to_string(),
            pair_id: PairId::new("WETH/USDC"),
            timestamp: Utc::now(),
            block: 7,
            success: true,
            reached: SettlementState::Repaid,
            borrow_amount: 1_000,
            lender_fee: 1,
            profit_realized: 20,
            gas_or_fee_cost: 3,
            gas_spent_wei: 100,
            failure_reason: None,
        };

        save_settlement_outcome(&dir, &outcome).unwrap();
        save_settlement_outcome(&dir, &outcome).unwrap();

        let contents = std::fs::read_to_string(daily_file(&dir, "settlements")).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["profit_realized"], 20);
        assert_eq!(parsed["reached"], "Repaid");
        std::fs::remove_dir_all(&dir).ok();
    }
}
