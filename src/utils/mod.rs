//! Utility functions and helpers

pub mod math;
pub mod logging;
pub mod health;
pub mod display;

pub use math::*;
pub use logging::*;
pub use health::*;
pub use display::*;
