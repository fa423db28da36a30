//! RPC provider setup

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::{
    errors::BotError,
    network::retry::{RetryConfig, retry_with_backoff},
    types::VenueId,
    ConcreteProvider,
};

/// Connects to `rpc_url` and confirms the node answers `eth_blockNumber`.
pub async fn setup_provider(rpc_url: &str) -> Result<Arc<ConcreteProvider>> {
    let provider: Arc<ConcreteProvider> = Arc::new(
        ProviderBuilder::new()
            .on_http(rpc_url.parse().context("Invalid RPC_URL")?)
            .boxed(),
    );

    info!("🔗 Testing connection to RPC endpoint...");
    let rpc = VenueId::new("rpc");
    let block = retry_with_backoff(
        || async {
            provider.get_block_number().await.map_err(|e| BotError::Network {
                message: "Failed to get block number".to_string(),
                source: Some(e.into()),
                retry_count: 0,
            })
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        &rpc,
        Duration::from_secs(10),
    )
    .await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        anyhow::anyhow!("Network connection failed: {}", e)
    })?;

    info!("✅ Connected at block {}", block);
    Ok(provider)
}
