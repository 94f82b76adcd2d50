//! Fallwatch Test Harness - Deterministic scenario replay
//!
//! This crate provides:
//! - Scenario timelines (JSON or builder) of posture and position commands
//! - A simulator stepping the full pipeline at 0.1 s resolution
//! - Scenario fixtures covering the documented behaviours

pub mod scenario;
pub mod simulator;
pub mod fixtures;

pub use scenario::*;
pub use simulator::*;
