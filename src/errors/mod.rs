//! Error handling and recovery mechanisms

pub mod bot_error;
pub mod recovery;

pub use bot_error::*;
pub use recovery::*;
