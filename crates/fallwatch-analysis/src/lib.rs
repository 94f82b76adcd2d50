//! Fallwatch Analysis - Snapshot engine
//!
//! Consumes the events accumulated since the previous cycle and produces one
//! immutable [`Snapshot`](fallwatch_core::Snapshot): world state, risk level,
//! confidence, hypotheses and a readable reasoning trace.

pub mod engine;

pub use engine::*;
