//! Fallwatch Runtime - Driving the pipeline
//!
//! This crate wires the stages together:
//! - Snapshot trigger: when to run a cycle, and when a cycle is redundant
//! - Pipeline: detection, trigger, snapshot, decision, arbiter and policy per tick
//! - Monitor: async driver draining a drop-oldest ingestion buffer
//! - Configuration, logging initialisation, artifact persistence and replay

pub mod trigger;
pub mod pipeline;
pub mod ingest;
pub mod monitor;
pub mod config;
pub mod telemetry;
pub mod store;
pub mod replay;

pub use trigger::*;
pub use pipeline::*;
pub use ingest::*;
pub use monitor::*;
pub use config::*;
pub use telemetry::{LogFormat, TracingSink};
pub use store::*;
