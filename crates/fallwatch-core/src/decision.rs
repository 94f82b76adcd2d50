//! Decision values produced by the deterministic engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FallwatchError, RiskLevel, SnapshotId};

/// Action tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Ignore,
    Monitor,
    RequestConfirmation,
    NotifyCaregiver,
    NotifyFamilyInfo,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Ignore => "IGNORE",
            Action::Monitor => "MONITOR",
            Action::RequestConfirmation => "REQUEST_CONFIRMATION",
            Action::NotifyCaregiver => "NOTIFY_CAREGIVER",
            Action::NotifyFamilyInfo => "NOTIFY_FAMILY_INFO",
        }
    }

    /// Actions that never notify a human
    #[inline]
    pub fn is_passive(self) -> bool {
        matches!(self, Action::Ignore | Action::Monitor)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IGNORE" => Ok(Action::Ignore),
            "MONITOR" => Ok(Action::Monitor),
            "REQUEST_CONFIRMATION" => Ok(Action::RequestConfirmation),
            "NOTIFY_CAREGIVER" => Ok(Action::NotifyCaregiver),
            "NOTIFY_FAMILY_INFO" => Ok(Action::NotifyFamilyInfo),
            other => Err(FallwatchError::UnparseableResponse(format!(
                "unknown action: {}",
                other
            ))),
        }
    }
}

/// Recommended next step attached to a decision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    ContinueObservation,
    IncreaseObservation,
    AwaitConfirmation,
    ContactCaregiver,
    InformFamily,
}

impl NextStep {
    /// Default follow-up for an action
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::Ignore => NextStep::ContinueObservation,
            Action::Monitor => NextStep::IncreaseObservation,
            Action::RequestConfirmation => NextStep::AwaitConfirmation,
            Action::NotifyCaregiver => NextStep::ContactCaregiver,
            Action::NotifyFamilyInfo => NextStep::InformFamily,
        }
    }
}

/// The rule that produced a decision, in evaluation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    DurationInformational,
    DurationCritical,
    FallLowPosture,
    FallRecovery,
    Instability,
    PotentialFallMonitoring,
    Baseline,
}

impl DecisionRule {
    pub fn all() -> &'static [DecisionRule] {
        &[
            DecisionRule::DurationInformational,
            DecisionRule::DurationCritical,
            DecisionRule::FallLowPosture,
            DecisionRule::FallRecovery,
            DecisionRule::Instability,
            DecisionRule::PotentialFallMonitoring,
            DecisionRule::Baseline,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionRule::DurationInformational => "duration_informational",
            DecisionRule::DurationCritical => "duration_critical",
            DecisionRule::FallLowPosture => "fall_low_posture",
            DecisionRule::FallRecovery => "fall_recovery",
            DecisionRule::Instability => "instability",
            DecisionRule::PotentialFallMonitoring => "potential_fall_monitoring",
            DecisionRule::Baseline => "baseline",
        }
    }
}

impl fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision - output of the decision engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub snapshot_id: SnapshotId,
    pub action: Action,
    pub risk_level: RiskLevel,
    /// Certainty about rule applicability, always 1.0
    pub confidence: f64,
    pub reasoning: String,
    pub next_step: NextStep,
    pub rule: DecisionRule,
}

impl Decision {
    pub fn new(
        snapshot_id: SnapshotId,
        rule: DecisionRule,
        action: Action,
        risk_level: RiskLevel,
        reasoning: impl Into<String>,
    ) -> Self {
        Decision {
            snapshot_id,
            action,
            risk_level,
            confidence: 1.0,
            reasoning: reasoning.into(),
            next_step: NextStep::for_action(action),
            rule,
        }
    }
}
