//! Block clock driving the orchestrator's ticks

use alloy::providers::Provider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};
use crate::ConcreteProvider;

/// Publishes the latest observed block number to every subscriber.
pub struct BlockClock {
    sender: watch::Sender<u64>,
}

impl BlockClock {
    pub fn new(start: u64) -> Self {
        let (sender, _) = watch::channel(start);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> u64 {
        *self.sender.borrow()
    }

    /// Publishes `block` if it is newer than the current one.
    pub fn advance_to(&self, block: u64) -> bool {
        self.sender.send_if_modified(|current| {
            if block > *current {
                *current = block;
                true
            } else {
                false
            }
        })
    }

    pub fn tick(&self) -> u64 {
        self.sender.send_modify(|current| *current += 1);
        self.current()
    }

    /// Fixed-interval tick counter for venues without a block concept.
    pub async fn run_ticks(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let block = self.tick();
                    debug!(block, "tick");
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("⏱️ Tick clock stopped at {}", self.current());
    }

    /// Polls the provider for new blocks.
    pub async fn follow_provider(
        self: Arc<Self>,
        provider: Arc<ConcreteProvider>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match provider.get_block_number().await {
                        Ok(block) => {
                            if self.advance_to(block) {
                                debug!(block, "new block");
                            }
                        }
                        Err(e) => warn!("⚠️ Failed to poll block number: {}", e),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("⏱️ Block follower stopped at {}", self.current());
    }
}
