//! Atomic settlement: ledger, flash lender, capabilities and the core state machine

pub mod ledger;
pub mod lender;
pub mod capability;
pub mod core;

pub use ledger::*;
pub use lender::*;
pub use capability::*;
pub use self::core::*;
