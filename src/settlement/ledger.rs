//! In-process ledger with all-or-nothing transactions
//!
//! Every mutation goes through [`Ledger::transact`], which runs the closure on
//! a working copy of the state and swaps it in only when the closure returns
//! `Ok`. An `Err` from any step leaves the committed state untouched.

use alloy::primitives::{Address, U256};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use crate::{
    types::{PairId, VenueId},
    utils::get_amount_out,
};

/// Balance holders on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Account {
    /// Flash-loan provider liquidity.
    Lender,
    /// The settlement program's own balance; retained profit lives here.
    Settlement,
    /// Operator treasury that receives withdrawn profit.
    Treasury,
    /// External traders moving simulated pools.
    Market,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{account:?} holds {available} of {asset}, needs {needed}")]
    InsufficientBalance {
        account: Account,
        asset: Address,
        needed: u128,
        available: u128,
    },

    #[error("Unknown pool {0}")]
    UnknownPool(VenueId),

    #[error("Token {token} is not traded by pool {venue}")]
    TokenNotInPool { venue: VenueId, token: Address },

    #[error("Swap of {amount_in} on {venue} produces no output")]
    ZeroOutput { venue: VenueId, amount_in: u128 },

    #[error("Caller does not hold the operator capability")]
    Unauthorized,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Constant-product pool held on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: u128,
    pub reserve1: u128,
    pub fee_bps: u32,
}

impl Pool {
    pub fn new(token0: Address, token1: Address, reserve0: u128, reserve1: u128, fee_bps: u32) -> Self {
        Self { token0, token1, reserve0, reserve1, fee_bps }
    }

    /// `(reserve_in, reserve_out)` for a swap selling `token_in`.
    pub fn reserves_for(&self, token_in: Address) -> Option<(u128, u128)> {
        if token_in == self.token0 {
            Some((self.reserve0, self.reserve1))
        } else if token_in == self.token1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    pub fn reserve_of(&self, token: Address) -> Option<u128> {
        if token == self.token0 {
            Some(self.reserve0)
        } else if token == self.token1 {
            Some(self.reserve1)
        } else {
            None
        }
    }

    pub fn quote(&self, token_in: Address, amount_in: u128) -> Option<u128> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in)?;
        Some(get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps))
    }

    fn apply_swap(&mut self, venue: &VenueId, token_in: Address, amount_in: u128) -> Result<u128, LedgerError> {
        let amount_out = self.quote(token_in, amount_in).ok_or_else(|| LedgerError::TokenNotInPool {
            venue: venue.clone(),
            token: token_in,
        })?;
        if amount_out == 0 {
            return Err(LedgerError::ZeroOutput { venue: venue.clone(), amount_in });
        }

        if token_in == self.token0 {
            self.reserve0 = self.reserve0.checked_add(amount_in).ok_or(LedgerError::Overflow)?;
            self.reserve1 -= amount_out;
        } else {
            self.reserve1 = self.reserve1.checked_add(amount_in).ok_or(LedgerError::Overflow)?;
            self.reserve0 -= amount_out;
        }
        Ok(amount_out)
    }
}

/// Committed ledger contents. Compared wholesale by atomicity tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    balances: BTreeMap<(Account, Address), u128>,
    pools: BTreeMap<VenueId, Pool>,
    /// Keyed by (intermediate asset, borrowed asset); 1e18-scaled.
    last_known_price: BTreeMap<(Address, Address), U256>,
    last_settlement_block: BTreeMap<PairId, u64>,
    paused: bool,
    owner: Option<String>,
    authorized_executor: Option<String>,
    cumulative_profit: BTreeMap<Address, u128>,
    settlements_completed: u64,
}

impl LedgerState {
    pub fn balance(&self, account: Account, asset: Address) -> u128 {
        self.balances.get(&(account, asset)).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, account: Account, asset: Address, amount: u128) -> Result<(), LedgerError> {
        let entry = self.balances.entry((account, asset)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    pub fn debit(&mut self, account: Account, asset: Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance(account, asset);
        if available < amount {
            return Err(LedgerError::InsufficientBalance { account, asset, needed: amount, available });
        }
        self.balances.insert((account, asset), available - amount);
        Ok(())
    }

    pub fn transfer(&mut self, from: Account, to: Account, asset: Address, amount: u128) -> Result<(), LedgerError> {
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)
    }

    pub fn pool(&self, venue: &VenueId) -> Option<&Pool> {
        self.pools.get(venue)
    }

    pub fn insert_pool(&mut self, venue: VenueId, pool: Pool) {
        self.pools.insert(venue, pool);
    }

    /// Overwrites reserves in token0/token1 order, keeping tokens and fee.
    pub fn set_reserves(&mut self, venue: &VenueId, reserve0: u128, reserve1: u128) -> Result<(), LedgerError> {
        let pool = self.pools.get_mut(venue).ok_or_else(|| LedgerError::UnknownPool(venue.clone()))?;
        pool.reserve0 = reserve0;
        pool.reserve1 = reserve1;
        Ok(())
    }

    /// Sells `amount_in` of `token_in` from `account` into the pool and
    /// credits the output back to `account`.
    pub fn swap(
        &mut self,
        venue: &VenueId,
        account: Account,
        token_in: Address,
        amount_in: u128,
    ) -> Result<u128, LedgerError> {
        let pool = self.pools.get_mut(venue).ok_or_else(|| LedgerError::UnknownPool(venue.clone()))?;
        let token_out = if token_in == pool.token0 { pool.token1 } else { pool.token0 };
        let amount_out = pool.apply_swap(venue, token_in, amount_in)?;
        self.debit(account, token_in, amount_in)?;
        self.credit(account, token_out, amount_out)?;
        Ok(amount_out)
    }

    pub fn last_known_price(&self, intermediate: Address, asset: Address) -> Option<U256> {
        self.last_known_price.get(&(intermediate, asset)).copied()
    }

    pub fn set_last_known_price(&mut self, intermediate: Address, asset: Address, price: U256) {
        self.last_known_price.insert((intermediate, asset), price);
    }

    pub fn last_settlement_block(&self, pair: &PairId) -> Option<u64> {
        self.last_settlement_block.get(pair).copied()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn cumulative_profits(&self) -> BTreeMap<Address, u128> {
        self.cumulative_profit.clone()
    }

    pub fn settlements_completed(&self) -> u64 {
        self.settlements_completed
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(crate) fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub(crate) fn set_owner(&mut self, owner: String) {
        self.owner = Some(owner);
    }

    pub(crate) fn authorized_executor(&self) -> Option<&str> {
        self.authorized_executor.as_deref()
    }

    pub(crate) fn set_authorized_executor(&mut self, executor: String) {
        self.authorized_executor = Some(executor);
    }

    pub(crate) fn record_settlement(&mut self, pair: &PairId, asset: Address, profit: u128, block: u64) -> Result<(), LedgerError> {
        let total = self.cumulative_profit.entry(asset).or_insert(0);
        *total = total.checked_add(profit).ok_or(LedgerError::Overflow)?;
        self.settlements_completed += 1;
        self.last_settlement_block.insert(pair.clone(), block);
        Ok(())
    }
}

/// Shared handle to the ledger. Clones refer to the same state.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: Arc<RwLock<LedgerState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a working copy and commits it only on `Ok`.
    /// Transactions are serialized by the write lock.
    pub fn transact<T, E>(&self, f: impl FnOnce(&mut LedgerState) -> Result<T, E>) -> Result<T, E> {
        let mut committed = self.state.write();
        let mut working = committed.clone();
        let value = f(&mut working)?;
        *committed = working;
        Ok(value)
    }

    /// Infallible write, used for administrative flags.
    pub fn update(&self, f: impl FnOnce(&mut LedgerState)) {
        f(&mut self.state.write());
    }

    pub fn read<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> T {
        f(&self.state.read())
    }

    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    pub fn balance(&self, account: Account, asset: Address) -> u128 {
        self.read(|state| state.balance(account, asset))
    }

    pub fn mint(&self, account: Account, asset: Address, amount: u128) -> Result<(), LedgerError> {
        self.transact(|state| state.credit(account, asset, amount))
    }

    pub fn burn(&self, account: Account, asset: Address, amount: u128) -> Result<(), LedgerError> {
        self.transact(|state| state.debit(account, asset, amount))
    }

    pub fn add_pool(&self, venue: VenueId, pool: Pool) {
        self.state.write().insert_pool(venue, pool);
    }

    pub fn pool(&self, venue: &VenueId) -> Option<Pool> {
        self.read(|state| state.pool(venue).cloned())
    }
}
