//! Fallwatch Detect - Per-tick perception processing
//!
//! This crate turns perception samples into events:
//! - Perception adapter: hip landmarks -> posture + vertical position
//! - Atomic detector: rapid vertical movement observations
//! - Floor tracker: continuous time spent on the floor
//! - Correlator: POTENTIAL_FALL and CONFIRMED_FALL_BY_DURATION hypotheses
//! - Detection stage: all of the above in tick order

pub mod perception;
pub mod atomic;
pub mod floor;
pub mod correlator;
pub mod stage;

pub use perception::*;
pub use atomic::*;
pub use floor::*;
pub use correlator::*;
pub use stage::*;
