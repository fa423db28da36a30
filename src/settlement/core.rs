//! Atomic settlement core
//!
//! One invocation walks `Requested -> Borrowed -> Leg1Executed ->
//! Leg2Executed -> ProfitVerified -> Repaid` inside a single ledger
//! transaction. Any abort discards the working copy, so balances, pools,
//! `LastKnownPrice` and statistics are exactly as they were before the call.

use alloy::primitives::{Address, U256};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::{
    types::{AbortReason, SettlementContext, SettlementOutcome, SettlementRequest, SettlementState},
    utils::{BPS_DENOMINATOR, deviation_bps, meets_bps_ratio, mul_div_ceil, price_x18, slippage_floor},
};
use super::{
    capability::{ExecutorCapability, OperatorCapability},
    ledger::{Account, Ledger, LedgerError, LedgerState},
    lender::FlashLender,
};

#[derive(Debug, Clone, Copy)]
pub struct SettlementParams {
    /// Blocks that must pass after a committed settlement on a pair before
    /// the next one is accepted.
    pub min_settlement_spacing_blocks: u64,
    pub lender_fee_bps: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementStats {
    pub settlements_completed: u64,
    pub cumulative_profit: BTreeMap<Address, u128>,
    pub aborts: BTreeMap<&'static str, u64>,
}

struct Executed {
    leg1_out: u128,
    leg2_out: u128,
    owed: u128,
}

pub struct SettlementCore {
    ledger: Ledger,
    lender: FlashLender,
    min_spacing_blocks: u64,
    /// Off-ledger receipts: counted even though the aborted transaction is discarded.
    aborts: Mutex<BTreeMap<&'static str, u64>>,
}

impl SettlementCore {
    /// Deploys the core on `ledger` and returns the owner capability.
    pub fn deploy(ledger: Ledger, params: SettlementParams) -> (Self, OperatorCapability) {
        let operator = OperatorCapability::mint();
        let owner = operator.id().to_string();
        ledger.update(|state| state.set_owner(owner));

        let core = Self {
            ledger,
            lender: FlashLender::new(params.lender_fee_bps),
            min_spacing_blocks: params.min_settlement_spacing_blocks,
            aborts: Mutex::new(BTreeMap::new()),
        };
        (core, operator)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn lender(&self) -> &FlashLender {
        &self.lender
    }

    fn is_owner(&self, operator: &OperatorCapability) -> bool {
        self.ledger.read(|state| state.owner() == Some(operator.id()))
    }

    /// Issues the executor identity accepted by [`SettlementCore::settle`],
    /// revoking any previously issued one.
    pub fn authorize_executor(&self, operator: &OperatorCapability) -> Option<ExecutorCapability> {
        if !self.is_owner(operator) {
            warn!("rejected executor authorization from non-owner");
            return None;
        }
        let executor = ExecutorCapability::mint();
        let id = executor.id().to_string();
        self.ledger.update(|state| state.set_authorized_executor(id));
        info!("🔑 Executor authorized");
        Some(executor)
    }

    pub fn pause(&self, operator: &OperatorCapability) -> bool {
        self.set_paused(operator, true)
    }

    pub fn unpause(&self, operator: &OperatorCapability) -> bool {
        self.set_paused(operator, false)
    }

    fn set_paused(&self, operator: &OperatorCapability, paused: bool) -> bool {
        if !self.is_owner(operator) {
            return false;
        }
        self.ledger.update(|state| state.set_paused(paused));
        info!(paused, "settlement pause flag changed");
        true
    }

    /// Moves retained profit from the settlement balance to the treasury.
    pub fn withdraw_profit(&self, operator: &OperatorCapability, asset: Address, amount: u128) -> Result<(), LedgerError> {
        if !self.is_owner(operator) {
            return Err(LedgerError::Unauthorized);
        }
        self.ledger
            .transact(|state| state.transfer(Account::Settlement, Account::Treasury, asset, amount))
    }

    pub fn last_known_price(&self, intermediate: Address, asset: Address) -> Option<U256> {
        self.ledger.read(|state| state.last_known_price(intermediate, asset))
    }

    pub fn stats(&self) -> SettlementStats {
        let (settlements_completed, cumulative_profit) =
            self.ledger.read(|state| (state.settlements_completed(), state.cumulative_profits()));
        SettlementStats {
            settlements_completed,
            cumulative_profit,
            aborts: self.aborts.lock().clone(),
        }
    }

    /// Runs one settlement attempt. Never panics and never leaves partial
    /// state: the returned outcome either reports `Repaid` with every balance
    /// change committed, or `Aborted` with none of them.
    pub fn settle(
        &self,
        executor: &ExecutorCapability,
        request: &SettlementRequest,
        ctx: SettlementContext,
    ) -> SettlementOutcome {
        let mut reached = SettlementState::Requested;
        let result = self
            .ledger
            .transact(|state| self.execute(state, executor, request, ctx, &mut reached));

        let mut outcome = SettlementOutcome {
            id: Uuid::new_v4().to_string(),
            pair_id: request.pair_id.clone(),
            timestamp: Utc::now(),
            block: ctx.block,
            success: false,
            reached,
            borrow_amount: request.borrow_amount,
            lender_fee: 0,
            profit_realized: 0,
            gas_or_fee_cost: ctx.execution_cost,
            gas_spent_wei: ctx.gas_spent_wei,
            failure_reason: None,
        };

        match result {
            Ok((executed, fee)) => {
                outcome.success = true;
                outcome.reached = SettlementState::Repaid;
                outcome.lender_fee = fee;
                outcome.profit_realized = executed.leg2_out - executed.owed;
                info!(
                    pair = %request.pair_id,
                    borrowed = request.borrow_amount,
                    leg1_out = executed.leg1_out,
                    leg2_out = executed.leg2_out,
                    fee,
                    profit = outcome.profit_realized,
                    "settlement repaid"
                );
            }
            Err(reason) => {
                *self.aborts.lock().entry(reason.kind()).or_insert(0) += 1;
                warn!(
                    pair = %request.pair_id,
                    state = ?reached,
                    reason = %reason,
                    "settlement aborted"
                );
                outcome.failure_reason = Some(reason);
            }
        }
        outcome
    }

    fn execute(
        &self,
        state: &mut LedgerState,
        executor: &ExecutorCapability,
        request: &SettlementRequest,
        ctx: SettlementContext,
        reached: &mut SettlementState,
    ) -> Result<(Executed, u128), AbortReason> {
        validate_request(request)?;

        // Requested -> Borrowed preconditions
        if state.authorized_executor() != Some(executor.id()) {
            return Err(AbortReason::Unauthorized);
        }
        if state.is_paused() {
            return Err(AbortReason::Paused);
        }
        if ctx.block > request.deadline_block {
            return Err(AbortReason::DeadlineExpired { deadline_block: request.deadline_block });
        }
        if let Some(last_block) = state.last_settlement_block(&request.pair_id) {
            if ctx.block < last_block.saturating_add(self.min_spacing_blocks) {
                return Err(AbortReason::TooSoon { last_block, min_spacing: self.min_spacing_blocks });
            }
        }
        check_and_record_price(state, request)?;

        let asset = request.asset;
        let intermediate = request.intermediate_asset;
        let (executed, fee) = self.lender.flash_loan(
            state,
            Account::Settlement,
            asset,
            request.borrow_amount,
            |state, fee| {
                *reached = SettlementState::Borrowed;

                let leg1_floor = slippage_floor(request.expected_leg1_out, request.max_slippage_bps);
                let leg1_out = swap_leg(state, request, 1, asset, request.borrow_amount, request.expected_leg1_out, leg1_floor)?;
                *reached = SettlementState::Leg1Executed;

                // Leg 2 is quoted for the leg 1 amount actually received.
                let leg2_quoted = mul_div_ceil(request.expected_leg2_out, leg1_out, request.expected_leg1_out)
                    .unwrap_or(u128::MAX);
                let leg2_floor = slippage_floor(leg2_quoted, request.max_slippage_bps);
                let leg2_out = swap_leg(state, request, 2, intermediate, leg1_out, leg2_quoted, leg2_floor)?;
                *reached = SettlementState::Leg2Executed;

                let owed = request.borrow_amount.saturating_add(fee);
                let profitable = leg2_out >= owed
                    && meets_bps_ratio(leg2_out - owed, owed, request.min_acceptable_profit_bps);
                if !profitable {
                    return Err(AbortReason::InsufficientProfit {
                        final_amount: leg2_out,
                        owed,
                        min_profit_bps: request.min_acceptable_profit_bps,
                    });
                }
                *reached = SettlementState::ProfitVerified;
                debug!(pair = %request.pair_id, leg1_out, leg2_out, owed, "profit verified");

                Ok(Executed { leg1_out, leg2_out, owed })
            },
        )?;

        state
            .record_settlement(&request.pair_id, asset, executed.leg2_out - executed.owed, ctx.block)
            .map_err(|e| AbortReason::InvalidRequest { reason: e.to_string() })?;
        *reached = SettlementState::Repaid;
        Ok((executed, fee))
    }
}

fn validate_request(request: &SettlementRequest) -> Result<(), AbortReason> {
    let invalid = |reason: &str| Err(AbortReason::InvalidRequest { reason: reason.to_string() });
    if request.borrow_amount == 0 {
        return invalid("zero borrow amount");
    }
    if request.expected_leg1_out == 0 || request.expected_leg2_out == 0 {
        return invalid("zero quoted output");
    }
    if request.asset == request.intermediate_asset {
        return invalid("asset and intermediate asset are identical");
    }
    if request.buy_venue == request.sell_venue {
        return invalid("buy and sell venue are identical");
    }
    if request.max_slippage_bps > BPS_DENOMINATOR {
        return invalid("slippage tolerance above 100%");
    }
    Ok(())
}

/// Compares the buy venue's price of the intermediate asset with the last
/// recorded one. Within bounds, the fresh price becomes the new reference.
fn check_and_record_price(state: &mut LedgerState, request: &SettlementRequest) -> Result<(), AbortReason> {
    let pool = state
        .pool(&request.buy_venue)
        .ok_or_else(|| AbortReason::UnknownVenue { venue: request.buy_venue.to_string() })?;
    let (base_reserve, quote_reserve) = match (
        pool.reserve_of(request.intermediate_asset),
        pool.reserve_of(request.asset),
    ) {
        (Some(base), Some(quote)) => (base, quote),
        _ => {
            return Err(AbortReason::InvalidRequest {
                reason: format!("venue {} does not trade the requested assets", request.buy_venue),
            });
        }
    };
    let current = price_x18(base_reserve, quote_reserve).ok_or_else(|| AbortReason::InvalidRequest {
        reason: format!("venue {} has no reserves", request.buy_venue),
    })?;

    if let Some(reference) = state.last_known_price(request.intermediate_asset, request.asset) {
        let deviation = deviation_bps(reference, current);
        if deviation > request.max_price_deviation_bps as u128 {
            return Err(AbortReason::PriceDeviation {
                deviation_bps: deviation,
                max_bps: request.max_price_deviation_bps,
            });
        }
    }
    state.set_last_known_price(request.intermediate_asset, request.asset, current);
    Ok(())
}

fn swap_leg(
    state: &mut LedgerState,
    request: &SettlementRequest,
    leg: u8,
    token_in: Address,
    amount_in: u128,
    quoted: u128,
    min_out: u128,
) -> Result<u128, AbortReason> {
    let venue = if leg == 1 { &request.buy_venue } else { &request.sell_venue };
    let actual = match state.swap(venue, Account::Settlement, token_in, amount_in) {
        Ok(out) => out,
        Err(LedgerError::ZeroOutput { .. }) => 0,
        Err(LedgerError::UnknownPool(venue)) => {
            return Err(AbortReason::UnknownVenue { venue: venue.to_string() });
        }
        Err(e) => return Err(AbortReason::InvalidRequest { reason: e.to_string() }),
    };
    if actual < min_out {
        return Err(AbortReason::ExcessiveSlippage { leg, quoted, min_out, actual });
    }
    Ok(actual)
}
