//! Bot configuration settings and environment variable handling

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use crate::{
    errors::{BotError, BotResult},
    network::RetryConfig,
    types::{AssetPair, PairId, USDC_DECIMALS, USDC_MAINNET, VenueId, WETH_DECIMALS, WETH_MAINNET},
    utils::{BPS_DENOMINATOR, from_units},
};

// Configuration constants
pub const MAX_SLIPPAGE_BPS: u32 = 1_000; // 10%
pub const MAX_PRICE_IMPACT_BPS: u32 = 2_000; // 20%
pub const DEFAULT_LENDER_FEE_BPS: u32 = 9; // 0.09%
pub const DEFAULT_GAS_PER_SETTLEMENT: u64 = 350_000;
pub const MAX_GAS_PRICE_GWEI: u64 = 500;
pub const DEFAULT_PAIRS_FILE: &str = "config/pairs.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Venues are pools on the in-process ledger, perturbed by a market simulator.
    Simulation,
    /// Quotes come from on-chain pools; settlement runs on a ledger synced from them.
    Shadow,
}

impl FromStr for ExecutionMode {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simulation" | "sim" => Ok(ExecutionMode::Simulation),
            "shadow" => Ok(ExecutionMode::Shadow),
            other => Err(BotError::config(format!("unknown execution mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueKind {
    /// Constant-product pool on the in-process ledger, seeded with raw reserves.
    Ledger { reserve_a: u128, reserve_b: u128 },
    /// Constant-product pool contract read through the RPC provider.
    OnChain { pool: Address },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueConfig {
    pub id: VenueId,
    pub kind: VenueKind,
    pub fee_bps: u32,
}

/// Per-pair limits. Amounts are raw units of the borrowed asset (asset B).
#[derive(Debug, Clone)]
pub struct PairConfig {
    pub id: PairId,
    pub pair: AssetPair,
    pub first_venue: VenueConfig,
    pub second_venue: VenueConfig,
    pub max_position: u128,
    pub min_liquidity: u128,
    pub max_price_impact_bps: u32,
    pub max_slippage_bps: u32,
    pub max_loan: u128,
    /// Price of the native gas token in whole units of asset B.
    pub native_price: Decimal,
}

impl PairConfig {
    pub fn venue(&self, id: &VenueId) -> Option<&VenueConfig> {
        [&self.first_venue, &self.second_venue].into_iter().find(|v| &v.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ExecutionMode,
    pub rpc_url: Option<String>,
    pub tick_interval_ms: u64,
    // Feed
    pub quote_staleness_secs: u64,
    pub venue_timeout_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    // Detector
    pub min_divergence_pct: Decimal,
    /// Divergences above this are treated as a broken or manipulated pool.
    pub max_divergence_pct: Decimal,
    /// Largest distance of either venue's rate from the two-venue mean.
    pub max_venue_deviation_pct: Decimal,
    // Settlement
    pub max_price_deviation_bps: u32,
    pub min_profit_bps: u32,
    pub min_settlement_spacing_blocks: u64,
    pub lender_fee_bps: u32,
    pub deadline_blocks: u64,
    // Circuit breaker
    pub max_consecutive_failures: u32,
    pub circuit_breaker_cooldown_secs: u64,
    pub per_trade_loss_ceiling: Decimal,
    pub max_cumulative_loss: Decimal,
    pub max_cumulative_gas_wei: u128,
    // Risk gate
    pub max_gas_price_gwei: u64,
    pub quiet_period_secs: u64,
    pub gas_per_settlement: u64,
    // Output
    pub output_dir: String,
    pub pairs_file: String,
    pub pairs: Vec<PairConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Simulation,
            rpc_url: None,
            tick_interval_ms: 2_000,
            quote_staleness_secs: 10,
            venue_timeout_ms: 3_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
            min_divergence_pct: dec!(0.5),
            max_divergence_pct: dec!(30),
            max_venue_deviation_pct: dec!(15),
            max_price_deviation_bps: 500,
            min_profit_bps: 10,
            min_settlement_spacing_blocks: 1,
            lender_fee_bps: DEFAULT_LENDER_FEE_BPS,
            deadline_blocks: 2,
            max_consecutive_failures: 3,
            circuit_breaker_cooldown_secs: 300,
            per_trade_loss_ceiling: dec!(50),
            max_cumulative_loss: dec!(500),
            max_cumulative_gas_wei: 5_000_000_000_000_000_000, // 5 native tokens
            max_gas_price_gwei: 50,
            quiet_period_secs: 4,
            gas_per_settlement: DEFAULT_GAS_PER_SETTLEMENT,
            output_dir: "output".to_string(),
            pairs_file: DEFAULT_PAIRS_FILE.to_string(),
            pairs: Vec::new(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Global settings from the environment, falling back to defaults.
    /// Pairs are loaded separately with [`Config::load_pairs`].
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            mode: env::var("EXECUTION_MODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.mode),
            rpc_url: env::var("RPC_URL").ok(),
            tick_interval_ms: env_or("TICK_INTERVAL_MS", defaults.tick_interval_ms).max(100),
            quote_staleness_secs: env_or("QUOTE_STALENESS_SECS", defaults.quote_staleness_secs),
            venue_timeout_ms: env_or("VENUE_TIMEOUT_MS", defaults.venue_timeout_ms).max(50),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts).clamp(1, 10),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            min_divergence_pct: env_or("MIN_DIVERGENCE_PCT", defaults.min_divergence_pct)
                .max(Decimal::ZERO),
            max_divergence_pct: env_or("MAX_DIVERGENCE_PCT", defaults.max_divergence_pct),
            max_venue_deviation_pct: env_or("MAX_VENUE_DEVIATION_PCT", defaults.max_venue_deviation_pct)
                .max(Decimal::ZERO),
            max_price_deviation_bps: env_or("MAX_PRICE_DEVIATION_BPS", defaults.max_price_deviation_bps)
                .min(BPS_DENOMINATOR),
            min_profit_bps: env_or("MIN_PROFIT_BPS", defaults.min_profit_bps),
            min_settlement_spacing_blocks: env_or(
                "MIN_SETTLEMENT_SPACING_BLOCKS",
                defaults.min_settlement_spacing_blocks,
            ),
            lender_fee_bps: env_or("LENDER_FEE_BPS", defaults.lender_fee_bps).min(BPS_DENOMINATOR),
            deadline_blocks: env_or("DEADLINE_BLOCKS", defaults.deadline_blocks),
            max_consecutive_failures: env_or("MAX_CONSECUTIVE_FAILURES", defaults.max_consecutive_failures)
                .max(1),
            circuit_breaker_cooldown_secs: env_or(
                "CIRCUIT_BREAKER_COOLDOWN_SECS",
                defaults.circuit_breaker_cooldown_secs,
            ),
            per_trade_loss_ceiling: env_or("PER_TRADE_LOSS_CEILING", defaults.per_trade_loss_ceiling),
            max_cumulative_loss: env_or("MAX_CUMULATIVE_LOSS", defaults.max_cumulative_loss),
            max_cumulative_gas_wei: env_or("MAX_CUMULATIVE_GAS_WEI", defaults.max_cumulative_gas_wei),
            max_gas_price_gwei: env_or("MAX_GAS_PRICE_GWEI", defaults.max_gas_price_gwei)
                .min(MAX_GAS_PRICE_GWEI),
            quiet_period_secs: env_or("QUIET_PERIOD_SECS", defaults.quiet_period_secs),
            gas_per_settlement: env_or("GAS_PER_SETTLEMENT", defaults.gas_per_settlement),
            output_dir: env::var("OUTPUT_DIR").unwrap_or(defaults.output_dir),
            pairs_file: env::var("PAIRS_FILE").unwrap_or(defaults.pairs_file),
            pairs: Vec::new(),
        }
    }

    /// Reads `pairs_file`. In simulation mode a missing file falls back to the
    /// built-in demo pair.
    pub fn load_pairs(&mut self) -> BotResult<()> {
        let path = Path::new(&self.pairs_file);
        if !path.exists() {
            if self.mode == ExecutionMode::Simulation {
                self.pairs = vec![demo_pair()];
                return Ok(());
            }
            return Err(BotError::config(format!(
                "pairs file {} not found (required in shadow mode)",
                self.pairs_file
            )));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BotError::config(format!("failed to read {}: {}", self.pairs_file, e)))?;
        self.pairs = parse_pairs(&contents)?;
        Ok(())
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.pairs.is_empty() {
            return Err(BotError::config("no pairs configured"));
        }
        if self.mode == ExecutionMode::Shadow && self.rpc_url.is_none() {
            return Err(BotError::config("RPC_URL is required in shadow mode"));
        }
        if self.max_divergence_pct <= self.min_divergence_pct {
            return Err(BotError::config(format!(
                "MAX_DIVERGENCE_PCT {} must exceed MIN_DIVERGENCE_PCT {}",
                self.max_divergence_pct, self.min_divergence_pct
            )));
        }
        for pair in &self.pairs {
            if pair.first_venue.id == pair.second_venue.id {
                return Err(BotError::config(format!("{}: both venues are {}", pair.id, pair.first_venue.id)));
            }
            if pair.pair.asset_a == pair.pair.asset_b {
                return Err(BotError::config(format!("{}: asset_a equals asset_b", pair.id)));
            }
            if pair.max_slippage_bps > MAX_SLIPPAGE_BPS {
                return Err(BotError::config(format!(
                    "{}: max_slippage_bps {} exceeds {}",
                    pair.id, pair.max_slippage_bps, MAX_SLIPPAGE_BPS
                )));
            }
            if pair.max_price_impact_bps == 0 || pair.max_price_impact_bps > MAX_PRICE_IMPACT_BPS {
                return Err(BotError::config(format!(
                    "{}: max_price_impact_bps must be in 1..={}",
                    pair.id, MAX_PRICE_IMPACT_BPS
                )));
            }
            for venue in [&pair.first_venue, &pair.second_venue] {
                if venue.fee_bps >= BPS_DENOMINATOR {
                    return Err(BotError::config(format!("{}: venue {} fee too high", pair.id, venue.id)));
                }
                if self.mode == ExecutionMode::Shadow && !matches!(venue.kind, VenueKind::OnChain { .. }) {
                    return Err(BotError::config(format!(
                        "{}: venue {} must be an on-chain pool in shadow mode",
                        pair.id, venue.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            initial_delay_ms: self.retry_base_delay_ms,
            max_delay_ms: self.retry_max_delay_ms,
            exponential_base: 2.0,
        }
    }

    pub fn venue_timeout(&self) -> Duration {
        Duration::from_millis(self.venue_timeout_ms)
    }

    pub fn max_gas_price_wei(&self) -> u128 {
        self.max_gas_price_gwei as u128 * 1_000_000_000
    }
}

/// WETH/USDC across two simulated pools with slightly different prices.
pub fn demo_pair() -> PairConfig {
    let pair = AssetPair::new(WETH_MAINNET, USDC_MAINNET, WETH_DECIMALS, USDC_DECIMALS);
    let weth = 10u128.pow(WETH_DECIMALS);
    let usdc = 10u128.pow(USDC_DECIMALS);
    PairConfig {
        id: PairId::new("WETH/USDC"),
        pair,
        first_venue: VenueConfig {
            id: VenueId::new("sim-alpha"),
            kind: VenueKind::Ledger { reserve_a: 1_000 * weth, reserve_b: 3_000_000 * usdc },
            fee_bps: 30,
        },
        second_venue: VenueConfig {
            id: VenueId::new("sim-beta"),
            kind: VenueKind::Ledger { reserve_a: 800 * weth, reserve_b: 2_430_000 * usdc },
            fee_bps: 30,
        },
        max_position: 50_000 * usdc,
        min_liquidity: 100_000 * usdc,
        max_price_impact_bps: 300,
        max_slippage_bps: 50,
        max_loan: 250_000 * usdc,
        native_price: dec!(3000),
    }
}

#[derive(Debug, Deserialize)]
struct RawPairsFile {
    pairs: Vec<RawPair>,
}

#[derive(Debug, Deserialize)]
struct RawPair {
    name: String,
    asset_a: String,
    asset_b: String,
    decimals_a: u32,
    decimals_b: u32,
    max_position: String,
    min_liquidity: String,
    max_price_impact_bps: u32,
    max_slippage_bps: u32,
    max_loan: String,
    native_price: String,
    venues: Vec<RawVenue>,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    name: String,
    kind: String,
    fee_bps: u32,
    pool: Option<String>,
    reserve_a: Option<String>,
    reserve_b: Option<String>,
}

fn parse_address(field: &str, value: &str) -> BotResult<Address> {
    Address::from_str(value).map_err(|e| BotError::config(format!("{}: invalid address '{}': {}", field, value, e)))
}

fn parse_decimal(field: &str, value: &str) -> BotResult<Decimal> {
    Decimal::from_str(value).map_err(|e| BotError::config(format!("{}: invalid number '{}': {}", field, value, e)))
}

/// Whole-unit decimal string to raw token units.
fn parse_amount(field: &str, value: &str, decimals: u32) -> BotResult<u128> {
    let units = parse_decimal(field, value)?;
    from_units(units, decimals).ok_or_else(|| BotError::config(format!("{}: amount '{}' out of range", field, value)))
}

fn parse_venue(pair: &RawPair, raw: &RawVenue) -> BotResult<VenueConfig> {
    let field = format!("{}.{}", pair.name, raw.name);
    let kind = match raw.kind.as_str() {
        "ledger" => {
            let reserve_a = raw
                .reserve_a
                .as_deref()
                .ok_or_else(|| BotError::config(format!("{}: ledger venue needs reserve_a", field)))?;
            let reserve_b = raw
                .reserve_b
                .as_deref()
                .ok_or_else(|| BotError::config(format!("{}: ledger venue needs reserve_b", field)))?;
            VenueKind::Ledger {
                reserve_a: parse_amount(&field, reserve_a, pair.decimals_a)?,
                reserve_b: parse_amount(&field, reserve_b, pair.decimals_b)?,
            }
        }
        "onchain" => {
            let pool = raw
                .pool
                .as_deref()
                .ok_or_else(|| BotError::config(format!("{}: onchain venue needs pool", field)))?;
            VenueKind::OnChain { pool: parse_address(&field, pool)? }
        }
        other => return Err(BotError::config(format!("{}: unknown venue kind '{}'", field, other))),
    };
    Ok(VenueConfig {
        id: VenueId::new(raw.name.clone()),
        kind,
        fee_bps: raw.fee_bps,
    })
}

pub fn parse_pairs(contents: &str) -> BotResult<Vec<PairConfig>> {
    let raw: RawPairsFile =
        toml::from_str(contents).map_err(|e| BotError::config(format!("invalid pairs file: {}", e)))?;

    raw.pairs
        .iter()
        .map(|p| {
            if p.venues.len() != 2 {
                return Err(BotError::config(format!(
                    "{}: exactly two venues required, found {}",
                    p.name,
                    p.venues.len()
                )));
            }
            let pair = AssetPair::new(
                parse_address(&p.name, &p.asset_a)?,
                parse_address(&p.name, &p.asset_b)?,
                p.decimals_a,
                p.decimals_b,
            );
            Ok(PairConfig {
                id: PairId::new(p.name.clone()),
                pair,
                first_venue: parse_venue(p, &p.venues[0])?,
                second_venue: parse_venue(p, &p.venues[1])?,
                max_position: parse_amount(&p.name, &p.max_position, p.decimals_b)?,
                min_liquidity: parse_amount(&p.name, &p.min_liquidity, p.decimals_b)?,
                max_price_impact_bps: p.max_price_impact_bps,
                max_slippage_bps: p.max_slippage_bps,
                max_loan: parse_amount(&p.name, &p.max_loan, p.decimals_b)?,
                native_price: parse_decimal(&p.name, &p.native_price)?,
            })
        })
        .collect()
}
