//! Risk gate and circuit breaker

pub mod circuit_breaker;
pub mod gate;

pub use circuit_breaker::*;
pub use gate::*;
