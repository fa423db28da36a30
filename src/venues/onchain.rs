//! Read-only constant-product pool read through an RPC provider

use alloy::{
    primitives::{Address, U256, keccak256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolValue,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;
use crate::{
    errors::{BotError, BotResult},
    types::{AssetPair, SwapDirection, VenueId, VenueQuote},
    ConcreteProvider,
};
use super::VenueAdapter;

pub struct OnChainVenue {
    id: VenueId,
    pool: Address,
    fee_bps: u32,
    provider: Arc<ConcreteProvider>,
    token0: OnceCell<Address>,
}

fn selector(signature: &str) -> Vec<u8> {
    keccak256(signature)[..4].to_vec()
}

impl OnChainVenue {
    pub fn new(id: VenueId, pool: Address, fee_bps: u32, provider: Arc<ConcreteProvider>) -> Self {
        Self { id, pool, fee_bps, provider, token0: OnceCell::new() }
    }

    async fn call(&self, signature: &str) -> BotResult<alloy::primitives::Bytes> {
        let tx = TransactionRequest::default()
            .to(self.pool)
            .input(selector(signature).into());
        self.provider.call(&tx).await.map_err(|e| BotError::Network {
            message: format!("{} on {} failed", signature, self.id),
            source: Some(e.into()),
            retry_count: 0,
        })
    }

    fn decode_error(&self, what: &str, e: alloy::sol_types::Error) -> BotError {
        BotError::Contract {
            contract: self.pool,
            message: format!("Failed to decode {}", what),
            source: e.into(),
        }
    }

    async fn token0(&self) -> BotResult<Address> {
        self.token0
            .get_or_try_init(|| async {
                let result = self.call("token0()").await?;
                Address::abi_decode(&result, true).map_err(|e| self.decode_error("token0", e))
            })
            .await
            .copied()
    }

    async fn reserves(&self) -> BotResult<(U256, U256)> {
        let result = self.call("getReserves()").await?;
        let decoded = <(U256, U256, U256)>::abi_decode(&result, true).map_err(|e| self.decode_error("reserves", e))?;
        Ok((decoded.0, decoded.1))
    }
}

fn to_raw(venue: &VenueId, value: U256) -> BotResult<u128> {
    u128::try_from(value).map_err(|_| BotError::InvalidQuote {
        venue: venue.clone(),
        reason: format!("reserve {} does not fit in 128 bits", value),
    })
}

#[async_trait]
impl VenueAdapter for OnChainVenue {
    fn venue_id(&self) -> &VenueId {
        &self.id
    }

    async fn get_quote(&self, pair: &AssetPair) -> BotResult<VenueQuote> {
        let token0 = self.token0().await?;
        let (reserve0, reserve1) = self.reserves().await?;
        let block = self.provider.get_block_number().await.ok();

        let (reserve_a, reserve_b) = if token0 == pair.asset_a {
            (reserve0, reserve1)
        } else if token0 == pair.asset_b {
            (reserve1, reserve0)
        } else {
            return Err(BotError::Venue {
                venue: self.id.clone(),
                message: format!("pool {} does not trade this pair", self.pool),
            });
        };

        Ok(VenueQuote {
            venue: self.id.clone(),
            pair: *pair,
            reserve_a: to_raw(&self.id, reserve_a)?,
            reserve_b: to_raw(&self.id, reserve_b)?,
            fee_bps: self.fee_bps,
            observed_block: block,
            observed_at: Utc::now(),
        })
    }

    async fn execute_trade(
        &self,
        _pair: &AssetPair,
        _direction: SwapDirection,
        _amount_in: u128,
        _min_amount_out: u128,
        _deadline_block: u64,
    ) -> BotResult<u128> {
        Err(BotError::Venue {
            venue: self.id.clone(),
            message: "on-chain venues are read-only; trades settle on the ledger".to_string(),
        })
    }
}
