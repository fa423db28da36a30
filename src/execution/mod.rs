//! Orchestration: block clock, per-pair control loop and market simulation

pub mod bootstrap;
pub mod clock;
pub mod orchestrator;
pub mod simulation;
pub mod stats;

pub use bootstrap::*;
pub use clock::*;
pub use orchestrator::*;
pub use simulation::*;
pub use stats::*;
