//! Analysis snapshot - the semantic summary of one cycle
//!
//! A snapshot is created once per cycle by the snapshot engine, is immutable
//! afterwards and its id correlates every downstream artifact of the cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EventSummary, EventType, ObservedState, Posture, SnapshotId, Timestamp};

/// Observed world-state tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldState {
    Normal,
    PossibleFallDetected,
    PossibleFallConfirmed,
    FallConfirmed,
}

impl WorldState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorldState::Normal => "normal",
            WorldState::PossibleFallDetected => "possible_fall_detected",
            WorldState::PossibleFallConfirmed => "possible_fall_confirmed",
            WorldState::FallConfirmed => "fall_confirmed",
        }
    }

    #[inline]
    pub fn is_normal(self) -> bool {
        self == WorldState::Normal
    }

    /// States that justify a `critical` risk level
    #[inline]
    pub fn is_confirmed(self) -> bool {
        matches!(
            self,
            WorldState::PossibleFallConfirmed | WorldState::FallConfirmed
        )
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level, ordered from least to most severe
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    #[inline]
    pub fn is_elevated(self) -> bool {
        self >= RiskLevel::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a snapshot was materialised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerReason {
    Timer,
    StateChange,
    CriticalEvent,
    ConfirmedFallByDuration,
}

impl TriggerReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerReason::Timer => "TIMER",
            TriggerReason::StateChange => "STATE_CHANGE",
            TriggerReason::CriticalEvent => "CRITICAL_EVENT",
            TriggerReason::ConfirmedFallByDuration => "CONFIRMED_FALL_BY_DURATION",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern tags detected over a window
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTag {
    ProlongedFloorImmobility,
    FallSequenceDetected,
    SuddenMotion,
    RepeatedInstability,
}

impl PatternTag {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternTag::ProlongedFloorImmobility => "prolonged_floor_immobility",
            PatternTag::FallSequenceDetected => "fall_sequence_detected",
            PatternTag::SuddenMotion => "sudden_motion",
            PatternTag::RepeatedInstability => "repeated_instability",
        }
    }

    /// Patterns the decision engine treats as instability
    #[inline]
    pub fn is_instability(self) -> bool {
        matches!(
            self,
            PatternTag::SuddenMotion
                | PatternTag::RepeatedInstability
                | PatternTag::FallSequenceDetected
        )
    }
}

impl fmt::Display for PatternTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hypothesis kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisType {
    Fall,
    PossibleFall,
    DurationConcern,
    Pattern,
}

impl HypothesisType {
    #[inline]
    pub fn is_fall_like(self) -> bool {
        matches!(self, HypothesisType::Fall | HypothesisType::PossibleFall)
    }
}

/// A single hypothesis about the world
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    #[serde(rename = "type")]
    pub kind: HypothesisType,
    pub description: String,
    pub confidence: f64,
}

impl Hypothesis {
    pub fn new(kind: HypothesisType, description: impl Into<String>, confidence: f64) -> Self {
        Hypothesis {
            kind,
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Window bounds of a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        TimeWindow { start, end }
    }
}

/// Analysis snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub generated_at: Timestamp,
    pub window: TimeWindow,
    pub world_state: WorldState,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub observed_state: ObservedState,
    pub detected_patterns: Vec<PatternTag>,
    pub hypotheses: Vec<Hypothesis>,
    pub event_counts: BTreeMap<EventType, usize>,
    pub supporting_events: Vec<EventSummary>,
    pub on_floor_duration_seconds: f64,
    /// Classification at snapshot time (`None` before the first sample)
    pub posture: Option<Posture>,
    pub trigger_reason: TriggerReason,
    /// Final fall confidence, when a potential fall was scored
    pub fall_confidence: Option<f64>,
    pub reasoning_trace: String,
}

impl Snapshot {
    pub fn has_pattern(&self, pattern: PatternTag) -> bool {
        self.detected_patterns.contains(&pattern)
    }

    pub fn has_fall_like_hypothesis(&self) -> bool {
        self.hypotheses.iter().any(|h| h.kind.is_fall_like())
    }

    pub fn has_hypothesis(&self, kind: HypothesisType) -> bool {
        self.hypotheses.iter().any(|h| h.kind == kind)
    }

    pub fn has_instability_pattern(&self) -> bool {
        self.detected_patterns.iter().any(|p| p.is_instability())
    }

    pub fn event_count(&self, event_type: EventType) -> usize {
        self.event_counts.get(&event_type).copied().unwrap_or(0)
    }

    pub fn total_events(&self) -> usize {
        self.event_counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert!(RiskLevel::High.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
    }

    #[test]
    fn test_tags_serialize_as_documented() {
        assert_eq!(
            serde_json::to_string(&WorldState::PossibleFallConfirmed).unwrap(),
            "\"possible_fall_confirmed\""
        );
        assert_eq!(
            serde_json::to_string(&TriggerReason::ConfirmedFallByDuration).unwrap(),
            "\"CONFIRMED_FALL_BY_DURATION\""
        );
        assert_eq!(
            serde_json::to_string(&PatternTag::ProlongedFloorImmobility).unwrap(),
            "\"prolonged_floor_immobility\""
        );
        let h = Hypothesis::new(HypothesisType::DurationConcern, "on floor", 0.7);
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json["type"], "duration_concern");
    }

    #[test]
    fn test_instability_patterns() {
        assert!(PatternTag::SuddenMotion.is_instability());
        assert!(PatternTag::FallSequenceDetected.is_instability());
        assert!(!PatternTag::ProlongedFloorImmobility.is_instability());
    }
}
