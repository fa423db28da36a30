//! Display and printing utilities

use tracing::{error, info, warn};
use crate::{
    execution::SessionStats,
    settlement::SettlementStats,
    storage::RejectionRecord,
    types::{HealthStatus, SettlementOutcome, SizedTrade},
    utils::to_units,
};

pub fn print_session_stats(stats: &SessionStats, health: &HealthStatus, settlement: &SettlementStats) {
    let runtime = stats.started.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   🔎 DETECTION:");
    info!("     Cycles: {}", stats.cycles);
    info!("     Opportunities: {}", stats.opportunities);
    info!("     Unprofitable after sizing: {}", stats.unprofitable);
    info!("     Risk rejections: {}", stats.rejections);

    info!("   ⚛️  SETTLEMENT:");
    info!("     Attempts: {}", stats.settlements);
    info!("     Committed: {}", stats.successful_settlements);
    info!("     Success rate: {:.1}%", stats.settlement_success_rate());
    info!("     Realized profit (raw): {}", stats.realized_profit);
    for (asset, profit) in &settlement.cumulative_profit {
        info!("     Ledger profit {}: {}", asset, profit);
    }
    if !settlement.aborts.is_empty() {
        info!("     Aborts:");
        for (kind, count) in &settlement.aborts {
            info!("       {}: {}", kind, count);
        }
    }

    info!("   ⚙️  SYSTEM:");
    info!("     Circuit breaker: {}", health.breaker);
    info!("     Consecutive failures: {}", health.consecutive_failures);
    info!("     Uptime: {}s", health.uptime_seconds);
    for (pair, at) in &health.last_quote {
        info!("     Last quotes {}: {}", pair, at.format("%H:%M:%S"));
    }
    if !health.stale_pairs.is_empty() {
        warn!("     Stale pairs: {:?}", health.stale_pairs);
    }

    if !stats.error_counts.is_empty() {
        info!("     Error summary:");
        for (error_type, count) in stats.error_counts.iter() {
            info!("       {}: {}", error_type, count);
        }
    }

    info!("");
}

pub fn print_sized_trade(trade: &SizedTrade) {
    let decimals_a = trade.opportunity.pair.decimals_a;
    let decimals_b = trade.opportunity.pair.decimals_b;
    info!("\n🎯 OPPORTUNITY #{}", trade.opportunity.id);
    info!("📍 Pair: {}", trade.opportunity.pair_id);
    info!("📋 Route: borrow, buy on {}, sell on {}", trade.opportunity.buy_venue, trade.opportunity.sell_venue);
    info!("💰 Sizing:");
    info!("   Buy rate:   {:.4}", trade.opportunity.buy_rate);
    info!("   Sell rate:  {:.4}", trade.opportunity.sell_rate);
    info!("   Divergence: {:.3}%", trade.opportunity.divergence_pct);
    info!("   Borrow:     {}", to_units(trade.input_amount, decimals_b));
    info!("   Leg 1 out:  {}", to_units(trade.expected_intermediate, decimals_a));
    info!("   Leg 2 out:  {}", to_units(trade.expected_output_amount, decimals_b));
    info!("   Lender fee: {}", to_units(trade.lender_fee, decimals_b));
    info!("   Exec cost:  {}", to_units(trade.execution_cost, decimals_b));
    info!("   Net profit: {}", to_units(trade.expected_profit, decimals_b));
    info!("   Impact:     {:.2}%", trade.price_impact_pct());
}

pub fn print_settlement_outcome(outcome: &SettlementOutcome, borrowed_decimals: u32) {
    if outcome.success {
        warn!("\n✅ SETTLEMENT COMMITTED #{}", outcome.id);
        warn!("📍 Pair: {} at block {}", outcome.pair_id, outcome.block);
        warn!("   Borrowed: {}", to_units(outcome.borrow_amount, borrowed_decimals));
        warn!("   Lender fee: {}", to_units(outcome.lender_fee, borrowed_decimals));
        warn!("   Profit: {}", to_units(outcome.profit_realized, borrowed_decimals));
        warn!("   Execution cost: {}", to_units(outcome.gas_or_fee_cost, borrowed_decimals));
    } else {
        let reason = outcome
            .failure_reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        error!("\n❌ SETTLEMENT ABORTED #{}", outcome.id);
        error!("   Pair: {} at block {} (reached {:?})", outcome.pair_id, outcome.block, outcome.reached);
        error!("   Reason: {}", reason);
        error!("   Execution cost: {}", to_units(outcome.gas_or_fee_cost, borrowed_decimals));
    }
}

pub fn print_rejection(record: &RejectionRecord) {
    warn!(
        pair = %record.pair_id,
        opportunity = %record.opportunity_id,
        input_amount = record.input_amount,
        expected_profit = record.expected_profit,
        "🚫 Risk gate rejected: {}",
        record.message
    );
}
