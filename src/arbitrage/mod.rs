//! Opportunity detection and position sizing

pub mod detector;
pub mod sizer;

pub use detector::*;
pub use sizer::*;
