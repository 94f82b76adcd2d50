//! Decision engine
//!
//! A pure function from snapshot to decision. Rules are evaluated in the
//! order of [`DecisionRule::all`]; the first rule that applies produces the
//! decision and is recorded on it. Duration rules come first so that a later
//! rule can never weaken an escalation.

use fallwatch_core::{Action, Decision, DecisionRule, PatternTag, RiskLevel, Snapshot};
use tracing::debug;

/// Decision thresholds, in seconds on the floor
#[derive(Clone, Debug)]
pub struct DecisionConfig {
    /// On the floor longer than this informs the family
    pub informational_after: f64,
    /// On the floor longer than this notifies the caregiver
    pub critical_after: f64,
    /// Low posture held at least this long without recovery is critical
    pub low_posture_after: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig {
            informational_after: 25.0,
            critical_after: 15.0,
            low_posture_after: 10.0,
        }
    }
}

/// Deterministic decision engine
#[derive(Clone, Debug, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        DecisionEngine { config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn decide(&self, snapshot: &Snapshot) -> Decision {
        let decision = DecisionRule::all()
            .iter()
            .find_map(|&rule| self.apply(rule, snapshot))
            .unwrap_or_else(|| self.baseline(snapshot));

        debug!(
            snapshot = %snapshot.id,
            action = %decision.action,
            rule = %decision.rule,
            risk = %decision.risk_level,
            "decision"
        );
        decision
    }

    fn apply(&self, rule: DecisionRule, snapshot: &Snapshot) -> Option<Decision> {
        let fall_like = snapshot.has_fall_like_hypothesis();
        let on_floor = snapshot.on_floor_duration_seconds;
        let state = snapshot.observed_state;
        let id = snapshot.id;

        match rule {
            DecisionRule::DurationInformational => {
                let prolonged = snapshot.has_pattern(PatternTag::ProlongedFloorImmobility);
                (prolonged || on_floor > self.config.informational_after).then(|| {
                    Decision::new(
                        id,
                        rule,
                        Action::NotifyFamilyInfo,
                        RiskLevel::High,
                        format!(
                            "Prolonged floor time ({:.1}s); informational notice",
                            on_floor
                        ),
                    )
                })
            }
            DecisionRule::DurationCritical => {
                (on_floor > self.config.critical_after).then(|| {
                    Decision::new(
                        id,
                        rule,
                        Action::NotifyCaregiver,
                        RiskLevel::Critical,
                        format!(
                            "{:.1}s on the floor exceeds {:.0}s",
                            on_floor, self.config.critical_after
                        ),
                    )
                })
            }
            DecisionRule::FallLowPosture => {
                if !(fall_like && state.posture.is_low()) {
                    return None;
                }
                let persistent =
                    on_floor >= self.config.low_posture_after && !state.recovery_detected();
                Some(if persistent {
                    Decision::new(
                        id,
                        rule,
                        Action::NotifyCaregiver,
                        RiskLevel::Critical,
                        format!("Fall with persistent low posture ({:.1}s)", on_floor),
                    )
                } else {
                    Decision::new(
                        id,
                        rule,
                        Action::RequestConfirmation,
                        RiskLevel::Medium,
                        "Fall detected but time in low posture is short or recent",
                    )
                })
            }
            DecisionRule::FallRecovery => (fall_like && state.recovery_detected()).then(|| {
                Decision::new(
                    id,
                    rule,
                    Action::Monitor,
                    RiskLevel::Medium,
                    "Fall detected but subject shows signs of recovery",
                )
            }),
            DecisionRule::Instability => {
                (!fall_like && snapshot.has_instability_pattern()).then(|| {
                    Decision::new(
                        id,
                        rule,
                        Action::Monitor,
                        RiskLevel::Medium,
                        "Instability detected without a fall hypothesis",
                    )
                })
            }
            DecisionRule::PotentialFallMonitoring => fall_like.then(|| {
                Decision::new(
                    id,
                    rule,
                    Action::Monitor,
                    RiskLevel::Medium,
                    "Potential fall detected, monitoring",
                )
            }),
            DecisionRule::Baseline => Some(self.baseline(snapshot)),
        }
    }

    fn baseline(&self, snapshot: &Snapshot) -> Decision {
        let total = snapshot.total_events();
        let reasoning = if total > 0 {
            format!("Observed {} events, no critical pattern", total)
        } else {
            "No significant events".to_string()
        };
        Decision::new(
            snapshot.id,
            DecisionRule::Baseline,
            Action::Ignore,
            RiskLevel::Low,
            reasoning,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use fallwatch_core::{
        Hypothesis, HypothesisType, MovementTrend, ObservedPosture, ObservedState, Posture,
        SnapshotId, SubjectId, TimeWindow, Timestamp, TriggerReason, WorldState,
    };

    fn snapshot() -> Snapshot {
        Snapshot {
            id: SnapshotId::new(SubjectId::new(1), 1),
            generated_at: Timestamp::from_millis(30_000),
            window: TimeWindow::new(Timestamp::ZERO, Timestamp::from_millis(30_000)),
            world_state: WorldState::Normal,
            risk_level: RiskLevel::Low,
            confidence: 0.5,
            observed_state: ObservedState::new(ObservedPosture::Standing, MovementTrend::Stable),
            detected_patterns: Vec::new(),
            hypotheses: Vec::new(),
            event_counts: BTreeMap::new(),
            supporting_events: Vec::new(),
            on_floor_duration_seconds: 0.0,
            posture: Some(Posture::Standing),
            trigger_reason: TriggerReason::Timer,
            fall_confidence: None,
            reasoning_trace: String::new(),
        }
    }

    fn with_fall(mut s: Snapshot, kind: HypothesisType, confidence: f64) -> Snapshot {
        s.world_state = WorldState::PossibleFallConfirmed;
        s.risk_level = RiskLevel::Critical;
        s.hypotheses.push(Hypothesis::new(kind, "fall", confidence));
        s
    }

    fn on_floor(mut s: Snapshot, secs: f64) -> Snapshot {
        s.observed_state = ObservedState::new(ObservedPosture::OnFloor, MovementTrend::Still);
        s.posture = Some(Posture::OnFloor);
        s.on_floor_duration_seconds = secs;
        s
    }

    #[test]
    fn test_quiet_snapshot_is_ignored() {
        let d = DecisionEngine::default().decide(&snapshot());
        assert_eq!(d.action, Action::Ignore);
        assert_eq!(d.risk_level, RiskLevel::Low);
        assert_eq!(d.rule, DecisionRule::Baseline);
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn test_recovery_monitors_instead_of_notifying() {
        let s = with_fall(snapshot(), HypothesisType::Fall, 0.9);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::Monitor);
        assert_eq!(d.rule, DecisionRule::FallRecovery);
        assert_ne!(d.action, Action::NotifyCaregiver);
    }

    #[test]
    fn test_short_low_posture_requests_confirmation() {
        let s = on_floor(with_fall(snapshot(), HypothesisType::Fall, 0.9), 3.0);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::RequestConfirmation);
        assert_eq!(d.risk_level, RiskLevel::Medium);
        assert_eq!(d.rule, DecisionRule::FallLowPosture);
    }

    #[test]
    fn test_persistent_low_posture_notifies_caregiver() {
        let s = on_floor(with_fall(snapshot(), HypothesisType::Fall, 0.9), 12.0);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::NotifyCaregiver);
        assert_eq!(d.risk_level, RiskLevel::Critical);
        assert_eq!(d.rule, DecisionRule::FallLowPosture);
    }

    #[test]
    fn test_duration_between_15_and_25_is_critical() {
        let s = on_floor(with_fall(snapshot(), HypothesisType::PossibleFall, 0.7), 20.0);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::NotifyCaregiver);
        assert_eq!(d.risk_level, RiskLevel::Critical);
        assert_eq!(d.rule, DecisionRule::DurationCritical);
    }

    #[test]
    fn test_long_duration_is_informational() {
        let s = on_floor(with_fall(snapshot(), HypothesisType::Fall, 0.95), 26.0);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::NotifyFamilyInfo);
        assert_eq!(d.risk_level, RiskLevel::High);
        assert_eq!(d.rule, DecisionRule::DurationInformational);
    }

    #[test]
    fn test_prolonged_pattern_is_informational_at_any_duration() {
        let mut s = on_floor(with_fall(snapshot(), HypothesisType::Fall, 0.95), 25.0);
        s.detected_patterns.push(PatternTag::ProlongedFloorImmobility);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::NotifyFamilyInfo);
    }

    #[test]
    fn test_exactly_25_without_pattern_is_critical() {
        let s = on_floor(with_fall(snapshot(), HypothesisType::Fall, 0.95), 25.0);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::NotifyCaregiver);
        assert_eq!(d.rule, DecisionRule::DurationCritical);
    }

    #[test]
    fn test_floor_time_escalates_without_fall_hypothesis() {
        let engine = DecisionEngine::default();

        let d = engine.decide(&on_floor(snapshot(), 15.0));
        assert_eq!(d.action, Action::Ignore);

        let d = engine.decide(&on_floor(snapshot(), 20.0));
        assert_eq!(d.action, Action::NotifyCaregiver);
        assert_eq!(d.risk_level, RiskLevel::Critical);
        assert_eq!(d.rule, DecisionRule::DurationCritical);

        let d = engine.decide(&on_floor(snapshot(), 40.0));
        assert_eq!(d.action, Action::NotifyFamilyInfo);
        assert_eq!(d.risk_level, RiskLevel::High);
        assert_eq!(d.rule, DecisionRule::DurationInformational);
    }

    #[test]
    fn test_instability_without_fall_monitors() {
        let mut s = snapshot();
        s.risk_level = RiskLevel::Medium;
        s.detected_patterns.push(PatternTag::SuddenMotion);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::Monitor);
        assert_eq!(d.rule, DecisionRule::Instability);
    }

    #[test]
    fn test_unresolved_fall_keeps_monitoring() {
        let mut s = with_fall(snapshot(), HypothesisType::PossibleFall, 0.6);
        s.observed_state = ObservedState::new(ObservedPosture::Standing, MovementTrend::Unstable);
        let d = DecisionEngine::default().decide(&s);
        assert_eq!(d.action, Action::Monitor);
        assert_eq!(d.rule, DecisionRule::PotentialFallMonitoring);
        assert_eq!(d.reasoning, "Potential fall detected, monitoring");
    }

    #[test]
    fn test_decide_is_deterministic() {
        let engine = DecisionEngine::default();
        let s = on_floor(with_fall(snapshot(), HypothesisType::Fall, 0.9), 12.0);
        assert_eq!(engine.decide(&s), engine.decide(&s));
    }
}
