//! Gas price sources for the risk gate

use alloy::providers::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use crate::{
    errors::{BotError, BotResult},
    ConcreteProvider,
};

#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_price_wei(&self) -> BotResult<u128>;
}

pub struct ProviderGasOracle {
    provider: Arc<ConcreteProvider>,
}

impl ProviderGasOracle {
    pub fn new(provider: Arc<ConcreteProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl GasOracle for ProviderGasOracle {
    async fn gas_price_wei(&self) -> BotResult<u128> {
        self.provider.get_gas_price().await.map_err(|e| BotError::Network {
            message: "Failed to get gas price".to_string(),
            source: Some(e.into()),
            retry_count: 0,
        })
    }
}

/// Constant gas price for simulation mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGasOracle {
    wei: u128,
}

impl FixedGasOracle {
    pub fn new(wei: u128) -> Self {
        Self { wei }
    }

    pub fn from_gwei(gwei: u64) -> Self {
        Self::new(gwei as u128 * 1_000_000_000)
    }
}

#[async_trait]
impl GasOracle for FixedGasOracle {
    async fn gas_price_wei(&self) -> BotResult<u128> {
        Ok(self.wei)
    }
}
