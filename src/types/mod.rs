//! Core data types and structures

pub mod addresses;
pub mod pair;
pub mod quote;
pub mod arbitrage;
pub mod risk;
pub mod settlement;
pub mod health;

pub use addresses::*;
pub use pair::*;
pub use quote::*;
pub use arbitrage::*;
pub use risk::*;
pub use settlement::*;
pub use health::*;
