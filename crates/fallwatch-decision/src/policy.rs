//! Communication policy
//!
//! Separates deciding from notifying. The decision engine's caregiver call
//! can never be vetoed, and the arbiter can never escalate a low-risk
//! snapshot into a message on its own.

use fallwatch_core::{
    Action, ArbiterResult, ArbiterStatus, Decision, PolicyAction, PolicyResult, Recipient,
    Snapshot,
};
use tracing::{debug, info};

/// Policy configuration
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    /// Channel tag carried on every result
    pub channel: String,
    /// Decisions below this confidence are flagged `low_confidence`
    pub low_confidence_below: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            channel: "TELEGRAM".to_string(),
            low_confidence_below: 0.8,
        }
    }
}

/// Communication policy gatekeeper
#[derive(Clone, Debug, Default)]
pub struct CommunicationPolicy {
    config: PolicyConfig,
}

impl CommunicationPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        CommunicationPolicy { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        decision: &Decision,
        arbiter: Option<&ArbiterResult>,
        snapshot: &Snapshot,
    ) -> PolicyResult {
        let arbiter_decision = arbiter.map(|a| a.final_decision);

        let (action, recipient, reason) = match decision.action {
            Action::NotifyCaregiver => (
                PolicyAction::SendMessage,
                Recipient::Caregiver,
                format!("System enforced notification (Risk: {})", decision.risk_level),
            ),
            Action::NotifyFamilyInfo => (
                PolicyAction::SendMessage,
                Recipient::Family,
                "Approved: Family information update (Confirmed Duration Fall)".to_string(),
            ),
            action if arbiter_decision == Some(Action::NotifyCaregiver) && !action.is_passive() => {
                if snapshot.risk_level.is_elevated() {
                    (
                        PolicyAction::SendMessage,
                        Recipient::Caregiver,
                        "LLM recommendation validated by high risk level".to_string(),
                    )
                } else {
                    (
                        PolicyAction::SuppressMessage,
                        Recipient::Caregiver,
                        "LLM recommended notification but suppressed (Risk too low for auto-send)"
                            .to_string(),
                    )
                }
            }
            _ => (
                PolicyAction::SuppressMessage,
                Recipient::Caregiver,
                "No criteria met for external communication".to_string(),
            ),
        };

        let result = PolicyResult {
            snapshot_id: decision.snapshot_id,
            action,
            reason,
            recipient,
            channel: self.config.channel.clone(),
            decision: decision.action,
            arbiter_decision,
            context_flags: self.context_flags(decision, arbiter, snapshot),
        };

        if result.is_send() {
            info!(
                snapshot = %result.snapshot_id,
                recipient = ?result.recipient,
                channel = %result.channel,
                reason = %result.reason,
                "message authorised"
            );
        } else {
            debug!(snapshot = %result.snapshot_id, reason = %result.reason, "message suppressed");
        }
        result
    }

    fn context_flags(
        &self,
        decision: &Decision,
        arbiter: Option<&ArbiterResult>,
        snapshot: &Snapshot,
    ) -> Vec<String> {
        let mut flags = Vec::new();
        if decision.confidence < self.config.low_confidence_below {
            flags.push("low_confidence".to_string());
        }
        if let Some(arbiter) = arbiter {
            match arbiter.status {
                ArbiterStatus::Observed => flags.push("llm_observe_mode".to_string()),
                ArbiterStatus::Skipped => flags.push("llm_skipped".to_string()),
                ArbiterStatus::Enforced => {}
            }
            flags.extend(arbiter.uncertainty_flags().iter().cloned());
        }
        if snapshot.on_floor_duration_seconds > 0.0 {
            flags.push(format!(
                "on_floor_duration_seconds={:.1}",
                snapshot.on_floor_duration_seconds
            ));
        }
        flags
    }
}
