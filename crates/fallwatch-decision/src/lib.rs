//! Fallwatch Decision - From snapshot to notification
//!
//! This crate implements the per-cycle decision stages:
//! - Decision engine: ordered deterministic rules, snapshot -> action
//! - Reasoning providers: mock and OpenAI-compatible HTTP backends
//! - Arbiter: bounded, fail-safe secondary assessment of ambiguous decisions
//! - Message preview: localized title/body derived from the assessment
//! - Communication policy: whether a human is actually notified

pub mod engine;
pub mod provider;
pub mod prompt;
pub mod preview;
pub mod arbiter;
pub mod policy;

pub use engine::*;
pub use provider::*;
pub use prompt::*;
pub use preview::*;
pub use arbiter::*;
pub use policy::*;
