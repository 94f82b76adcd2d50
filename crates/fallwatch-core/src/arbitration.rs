//! Arbiter outcome values

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Action, FallwatchError, RiskLevel, SnapshotId};

/// What the arbiter actually did with a decision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArbiterStatus {
    /// Not evaluated, or evaluation failed; the decision is unchanged
    Skipped,
    /// Evaluated and recorded as metadata only
    Observed,
    /// Evaluated and the recommendation became the final decision
    Enforced,
}

/// Operating mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArbiterMode {
    #[default]
    Observe,
    Enforce,
}

impl ArbiterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ArbiterMode::Observe => "observe",
            ArbiterMode::Enforce => "enforce",
        }
    }
}

impl fmt::Display for ArbiterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArbiterMode {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observe" => Ok(ArbiterMode::Observe),
            "enforce" => Ok(ArbiterMode::Enforce),
            other => Err(FallwatchError::invalid_config(
                "LLM_MODE",
                format!("expected observe or enforce, got {:?}", other),
            )),
        }
    }
}

/// Closed set of tags the external reasoning pass may recommend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    NotifyCaregiver,
    RequestConfirmation,
    Monitor,
    Ignore,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        self.action().as_str()
    }

    pub fn action(self) -> Action {
        match self {
            Recommendation::NotifyCaregiver => Action::NotifyCaregiver,
            Recommendation::RequestConfirmation => Action::RequestConfirmation,
            Recommendation::Monitor => Action::Monitor,
            Recommendation::Ignore => Action::Ignore,
        }
    }
}

impl FromStr for Recommendation {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NOTIFY_CAREGIVER" => Ok(Recommendation::NotifyCaregiver),
            "REQUEST_CONFIRMATION" => Ok(Recommendation::RequestConfirmation),
            "MONITOR" => Ok(Recommendation::Monitor),
            "IGNORE" => Ok(Recommendation::Ignore),
            other => Err(FallwatchError::UnparseableResponse(format!(
                "recommendation outside closed set: {:?}",
                other
            ))),
        }
    }
}

/// Assessment returned by the reasoning backend, recorded in observe mode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArbiterDebug {
    pub recommendation: Recommendation,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub uncertainty_flags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Language of message previews
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-BR")]
    PtBr,
}

impl FromStr for Locale {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "en" | "en-US" | "en_US" => Ok(Locale::En),
            "pt-BR" | "pt_BR" | "pt" => Ok(Locale::PtBr),
            other => Err(FallwatchError::invalid_config(
                "FALLWATCH_LOCALE",
                format!("unsupported locale {:?}", other),
            )),
        }
    }
}

/// Human-facing message preview derived from the external reasoning
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePreview {
    pub title: String,
    pub body: String,
    pub requires_ack: bool,
    pub locale: Locale,
}

/// Arbiter result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArbiterResult {
    pub snapshot_id: SnapshotId,
    pub original_decision: Action,
    pub final_decision: Action,
    pub confidence: f64,
    pub reasoning: String,
    pub status: ArbiterStatus,
    pub mode: ArbiterMode,
    pub debug: Option<ArbiterDebug>,
    pub preview: Option<MessagePreview>,
    pub model: Option<String>,
}

impl ArbiterResult {
    #[inline]
    pub fn is_skipped(&self) -> bool {
        self.status == ArbiterStatus::Skipped
    }

    /// Uncertainty flags reported by the backend, if any were recorded
    pub fn uncertainty_flags(&self) -> &[String] {
        self.debug
            .as_ref()
            .map(|d| d.uncertainty_flags.as_slice())
            .unwrap_or(&[])
    }
}
