//! Shared fixtures for integration tests

#![allow(dead_code)]

use atomic_arb_bot::{
    config::{PairConfig, VenueConfig, VenueKind},
    settlement::{Account, ExecutorCapability, Ledger, OperatorCapability, Pool, SettlementCore, SettlementParams},
    types::{AssetPair, PairId, SettlementContext, SettlementRequest, USDC_MAINNET, VenueId, WETH_MAINNET},
};
use rust_decimal_macros::dec;

pub const WETH: u128 = 1_000_000_000_000_000_000;
pub const USDC: u128 = 1_000_000;

pub fn weth_usdc() -> AssetPair {
    AssetPair::new(WETH_MAINNET, USDC_MAINNET, 18, 6)
}

/// Two ledger venues "alpha" and "beta" for WETH/USDC.
pub fn pair_config(alpha: (u128, u128), beta: (u128, u128)) -> PairConfig {
    PairConfig {
        id: PairId::new("WETH/USDC"),
        pair: weth_usdc(),
        first_venue: VenueConfig {
            id: VenueId::new("alpha"),
            kind: VenueKind::Ledger { reserve_a: alpha.0, reserve_b: alpha.1 },
            fee_bps: 30,
        },
        second_venue: VenueConfig {
            id: VenueId::new("beta"),
            kind: VenueKind::Ledger { reserve_a: beta.0, reserve_b: beta.1 },
            fee_bps: 30,
        },
        max_position: 50_000 * USDC,
        min_liquidity: 1_000 * USDC,
        max_price_impact_bps: 2_000,
        max_slippage_bps: 50,
        max_loan: 250_000 * USDC,
        native_price: dec!(3000),
    }
}

pub struct Harness {
    pub ledger: Ledger,
    pub core: SettlementCore,
    pub operator: OperatorCapability,
    pub executor: ExecutorCapability,
}

/// A deployed core over `pools` with the lender holding `lender_funds` USDC.
pub fn harness(pools: &[(&str, Pool)], lender_funds: u128, spacing: u64) -> Harness {
    let ledger = Ledger::new();
    for (venue, pool) in pools {
        ledger.add_pool(VenueId::new(*venue), pool.clone());
    }
    ledger.mint(Account::Lender, USDC_MAINNET, lender_funds).unwrap();
    let (core, operator) = SettlementCore::deploy(
        ledger.clone(),
        SettlementParams { min_settlement_spacing_blocks: spacing, lender_fee_bps: 9 },
    );
    let executor = core.authorize_executor(&operator).unwrap();
    Harness { ledger, core, operator, executor }
}

pub fn weth_usdc_pool(reserve_weth: u128, reserve_usdc: u128, fee_bps: u32) -> Pool {
    Pool::new(WETH_MAINNET, USDC_MAINNET, reserve_weth, reserve_usdc, fee_bps)
}

/// Borrow USDC, buy WETH on `buy`, sell on `sell`.
pub fn request(
    buy: &str,
    sell: &str,
    borrow: u128,
    expected_leg1_out: u128,
    expected_leg2_out: u128,
    max_slippage_bps: u32,
    min_profit_bps: u32,
) -> SettlementRequest {
    SettlementRequest {
        pair_id: PairId::new("WETH/USDC"),
        asset: USDC_MAINNET,
        borrow_amount: borrow,
        intermediate_asset: WETH_MAINNET,
        buy_venue: VenueId::new(buy),
        sell_venue: VenueId::new(sell),
        expected_leg1_out,
        expected_leg2_out,
        min_acceptable_profit_bps: min_profit_bps,
        max_slippage_bps,
        max_price_deviation_bps: 500,
        deadline_block: 100,
    }
}

pub fn context(block: u64) -> SettlementContext {
    SettlementContext { block, execution_cost: 0, gas_spent_wei: 0 }
}

