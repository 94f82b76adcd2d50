//! Fallwatch Core - Fundamental types shared by every pipeline stage
//!
//! This crate defines:
//! - Identifiers (SubjectId, EventId, SnapshotId)
//! - Timestamps
//! - Typed perception events (atomic and composite)
//! - Snapshot, decision, arbitration and policy values
//! - Structured audit records and sinks
//! - System invariants

pub mod id;
pub mod time;
pub mod posture;
pub mod event;
pub mod snapshot;
pub mod decision;
pub mod arbitration;
pub mod policy;
pub mod record;
pub mod invariants;
pub mod error;

pub use id::*;
pub use time::*;
pub use posture::*;
pub use event::*;
pub use snapshot::*;
pub use decision::*;
pub use arbitration::*;
pub use policy::*;
pub use record::*;
pub use invariants::{InvariantViolation, Invariant};
pub use error::*;
