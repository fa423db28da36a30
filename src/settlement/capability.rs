//! Authorization capabilities for the settlement core
//!
//! Capabilities are unforgeable outside this crate: their identifiers are
//! private and minted only by [`SettlementCore`](super::SettlementCore).

use uuid::Uuid;

/// Owner token returned once at deployment. Required for pause, unpause,
/// executor authorization and profit withdrawal.
#[derive(Debug)]
pub struct OperatorCapability {
    id: String,
}

/// Identity of the orchestrator allowed to request settlements. Authorizing
/// a new executor revokes the previous one.
#[derive(Debug)]
pub struct ExecutorCapability {
    id: String,
}

impl OperatorCapability {
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4().to_string() }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }
}

impl ExecutorCapability {
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4().to_string() }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }
}
