//! Communication policy outcome

use serde::{Deserialize, Serialize};

use crate::{Action, SnapshotId};

/// Whether a message is authorised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyAction {
    SendMessage,
    SuppressMessage,
}

/// Intended recipient
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recipient {
    Family,
    Caregiver,
}

/// Policy result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub snapshot_id: SnapshotId,
    pub action: PolicyAction,
    pub reason: String,
    pub recipient: Recipient,
    pub channel: String,
    pub decision: Action,
    pub arbiter_decision: Option<Action>,
    pub context_flags: Vec<String>,
}

impl PolicyResult {
    #[inline]
    pub fn is_send(&self) -> bool {
        self.action == PolicyAction::SendMessage
    }
}
