//! Callback-style flash lender

use alloy::primitives::Address;
use crate::{
    types::AbortReason,
    utils::fee_on,
};
use super::ledger::{Account, LedgerState};

/// Lends from `Account::Lender` for the duration of a callback and pulls
/// `amount + fee` back afterwards. The fee is rounded up.
#[derive(Debug, Clone, Copy)]
pub struct FlashLender {
    fee_bps: u32,
}

impl FlashLender {
    pub fn new(fee_bps: u32) -> Self {
        Self { fee_bps }
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn fee_for(&self, amount: u128) -> u128 {
        fee_on(amount, self.fee_bps)
    }

    /// Credits `amount` of `asset` to `borrower`, runs `callback` with the fee
    /// owed, then pulls repayment. Any error from the callback or the pull is
    /// returned as-is; the enclosing ledger transaction discards the loan.
    pub fn flash_loan<T>(
        &self,
        state: &mut LedgerState,
        borrower: Account,
        asset: Address,
        amount: u128,
        callback: impl FnOnce(&mut LedgerState, u128) -> Result<T, AbortReason>,
    ) -> Result<(T, u128), AbortReason> {
        let available = state.balance(Account::Lender, asset);
        if available < amount {
            return Err(AbortReason::LenderLiquidity { requested: amount, available });
        }
        let fee = self.fee_for(amount);
        let owed = amount.checked_add(fee).ok_or_else(|| AbortReason::InvalidRequest {
            reason: "loan amount overflows".to_string(),
        })?;

        state
            .transfer(Account::Lender, borrower, asset, amount)
            .map_err(|e| AbortReason::InvalidRequest { reason: e.to_string() })?;

        let value = callback(state, fee)?;

        let held = state.balance(borrower, asset);
        state
            .transfer(borrower, Account::Lender, asset, owed)
            .map_err(|_| AbortReason::RepaymentShortfall { owed, available: held })?;

        Ok((value, fee))
    }
}
