//! Analysis snapshot engine
//!
//! Priority chain over the buffered events (first match sets world state):
//! duration confirmation, then potential fall, then normal. Rapid movement
//! may raise a low risk to medium but never lowers an escalated one.

use std::collections::BTreeMap;
use std::time::Duration;

use fallwatch_core::{
    Event, EventKind, EventType, Hypothesis, HypothesisType, IdSequence, MovementTrend,
    ObservedPosture, ObservedState, PatternTag, Posture, RiskLevel, Snapshot, Timestamp,
    TimeWindow, TriggerReason, WorldState,
};
use tracing::debug;

/// Snapshot engine configuration
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    /// Window assumed when the buffer is empty, and the timer interval
    pub interval: Duration,
    /// Confidence bonus per second on the floor
    pub duration_bonus_rate: f64,
    pub duration_bonus_cap: f64,
    /// Fall confidence above which a potential fall is escalated
    pub escalation_confidence: f64,
    /// Floor time after which a non-normal state raises a duration concern
    pub duration_concern_after: f64,
    /// Rapid movements in one window before they count as repeated instability
    pub repeated_instability_min: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            interval: Duration::from_secs(10),
            duration_bonus_rate: 0.02,
            duration_bonus_cap: 0.15,
            escalation_confidence: 0.8,
            duration_concern_after: 5.0,
            repeated_instability_min: 3,
        }
    }
}

/// Inputs of one snapshot cycle
#[derive(Clone, Copy, Debug)]
pub struct SnapshotRequest<'a> {
    pub events: &'a [Event],
    pub now: Timestamp,
    pub trigger: TriggerReason,
    pub posture: Option<Posture>,
    pub on_floor_duration: f64,
}

/// Analysis snapshot engine
#[derive(Clone, Debug, Default)]
pub struct SnapshotEngine {
    config: SnapshotConfig,
}

struct Assessment {
    world_state: WorldState,
    risk_level: RiskLevel,
    patterns: Vec<PatternTag>,
    fall_confidence: Option<f64>,
    trace: Vec<String>,
}

impl SnapshotEngine {
    pub fn new(config: SnapshotConfig) -> Self {
        SnapshotEngine { config }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Build the snapshot for one cycle. The id is drawn from `ids` and is the
    /// correlation key of the cycle.
    pub fn build(&self, request: SnapshotRequest<'_>, ids: &mut IdSequence) -> Snapshot {
        let mut sorted: Vec<&Event> = request.events.iter().collect();
        sorted.sort_by_key(|e| e.timestamp);

        let window = match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) => TimeWindow::new(first.timestamp, last.timestamp),
            _ => TimeWindow::new(request.now.saturating_sub(self.config.interval), request.now),
        };

        let mut event_counts: BTreeMap<EventType, usize> = BTreeMap::new();
        for event in &sorted {
            *event_counts.entry(event.event_type()).or_insert(0) += 1;
        }
        let (composite, atomic): (Vec<&Event>, Vec<&Event>) =
            sorted.iter().copied().partition(|e| e.is_composite());

        let mut assessment = self.assess(&composite, request.on_floor_duration);
        self.apply_motion(&atomic, &mut assessment);
        if sorted.is_empty() {
            assessment.trace.push("No events observed in window".to_string());
        }

        let confidence = snapshot_confidence(assessment.risk_level, !sorted.is_empty());
        let observed_state = observe_state(
            request.posture,
            sorted.last().map(|e| e.event_type()),
            assessment.world_state,
            !atomic.is_empty(),
        );
        let hypotheses = self.hypotheses(&assessment, confidence, request.on_floor_duration);

        let snapshot = Snapshot {
            id: ids.next_snapshot(),
            generated_at: request.now,
            window,
            world_state: assessment.world_state,
            risk_level: assessment.risk_level,
            confidence,
            observed_state,
            detected_patterns: assessment.patterns,
            hypotheses,
            event_counts,
            supporting_events: sorted.iter().map(|e| e.summary()).collect(),
            on_floor_duration_seconds: request.on_floor_duration,
            posture: request.posture,
            trigger_reason: request.trigger,
            fall_confidence: assessment.fall_confidence,
            reasoning_trace: assessment.trace.join("; "),
        };

        debug!(
            snapshot = %snapshot.id,
            world_state = %snapshot.world_state,
            risk = %snapshot.risk_level,
            events = snapshot.supporting_events.len(),
            trigger = %snapshot.trigger_reason,
            "snapshot built"
        );
        snapshot
    }

    fn assess(&self, composite: &[&Event], on_floor_duration: f64) -> Assessment {
        let confirmed: Vec<&Event> = composite
            .iter()
            .copied()
            .filter(|e| e.event_type() == EventType::ConfirmedFallByDuration)
            .collect();
        let potential: Vec<&Event> = composite
            .iter()
            .copied()
            .filter(|e| e.event_type() == EventType::PotentialFall)
            .collect();

        if let Some(latest) = confirmed.last() {
            let duration = match latest.kind {
                EventKind::ConfirmedFallByDuration { on_floor_duration } => on_floor_duration,
                _ => on_floor_duration,
            };
            return Assessment {
                world_state: WorldState::FallConfirmed,
                risk_level: RiskLevel::Critical,
                patterns: vec![PatternTag::ProlongedFloorImmobility],
                fall_confidence: Some(latest.confidence_hint),
                trace: vec![format!(
                    "CONFIRMED_FALL_BY_DURATION present: on floor for {:.1}s",
                    duration
                )],
            };
        }

        if let Some(latest) = potential.last() {
            let base = latest.confidence_hint;
            let bonus = (on_floor_duration * self.config.duration_bonus_rate)
                .min(self.config.duration_bonus_cap);
            let final_confidence = (base + bonus).min(1.0);

            let mut trace = vec![
                format!("Detected {} POTENTIAL_FALL events", potential.len()),
                format!(
                    "Latest fall confidence {:.2} + duration bonus {:.2} = {:.2}",
                    base, bonus, final_confidence
                ),
            ];
            let (world_state, risk_level) = if final_confidence > self.config.escalation_confidence {
                trace.push("Fall confidence above escalation threshold".to_string());
                (WorldState::PossibleFallConfirmed, RiskLevel::Critical)
            } else {
                (WorldState::PossibleFallDetected, RiskLevel::High)
            };
            return Assessment {
                world_state,
                risk_level,
                patterns: vec![PatternTag::FallSequenceDetected],
                fall_confidence: Some(final_confidence),
                trace,
            };
        }

        Assessment {
            world_state: WorldState::Normal,
            risk_level: RiskLevel::Low,
            patterns: Vec::new(),
            fall_confidence: None,
            trace: Vec::new(),
        }
    }

    fn apply_motion(&self, atomic: &[&Event], assessment: &mut Assessment) {
        let rapid = atomic
            .iter()
            .filter(|e| e.event_type() == EventType::RapidVerticalMovement)
            .count();
        if rapid == 0 {
            return;
        }
        if assessment.risk_level == RiskLevel::Low {
            assessment.risk_level = RiskLevel::Medium;
            assessment.patterns.push(PatternTag::SuddenMotion);
        }
        if rapid >= self.config.repeated_instability_min {
            assessment.patterns.push(PatternTag::RepeatedInstability);
        }
        assessment
            .trace
            .push(format!("Observed {} rapid vertical movements", rapid));
    }

    fn hypotheses(
        &self,
        assessment: &Assessment,
        confidence: f64,
        on_floor_duration: f64,
    ) -> Vec<Hypothesis> {
        let mut hypotheses = Vec::new();
        let fall_confidence = assessment.fall_confidence.unwrap_or(confidence);

        match assessment.world_state {
            WorldState::Normal => {}
            WorldState::PossibleFallDetected => hypotheses.push(Hypothesis::new(
                HypothesisType::PossibleFall,
                "Rapid descent consistent with a fall, not yet corroborated",
                fall_confidence,
            )),
            WorldState::PossibleFallConfirmed => hypotheses.push(Hypothesis::new(
                HypothesisType::Fall,
                "Rapid descent corroborated by fall confidence",
                fall_confidence,
            )),
            WorldState::FallConfirmed => hypotheses.push(Hypothesis::new(
                HypothesisType::Fall,
                "Subject remained on the floor past the confirmation threshold",
                fall_confidence,
            )),
        }

        if !assessment.world_state.is_normal()
            && on_floor_duration > self.config.duration_concern_after
        {
            hypotheses.push(Hypothesis::new(
                HypothesisType::DurationConcern,
                format!("On floor for {:.1}s", on_floor_duration),
                confidence,
            ));
        }

        for pattern in &assessment.patterns {
            hypotheses.push(Hypothesis::new(
                HypothesisType::Pattern,
                pattern.as_str(),
                confidence,
            ));
        }
        hypotheses
    }
}

/// Coarse confidence, monotone in risk
fn snapshot_confidence(risk: RiskLevel, has_events: bool) -> f64 {
    match risk {
        RiskLevel::Critical => 0.9,
        RiskLevel::High => 0.8,
        RiskLevel::Medium => 0.7,
        RiskLevel::Low if has_events => 0.6,
        RiskLevel::Low => 0.5,
    }
}

fn observe_state(
    posture: Option<Posture>,
    latest_event: Option<EventType>,
    world_state: WorldState,
    has_motion: bool,
) -> ObservedState {
    let observed_posture = match posture {
        None => ObservedPosture::Unknown,
        Some(Posture::OnFloor) => ObservedPosture::OnFloor,
        Some(Posture::Standing) if latest_event == Some(EventType::PotentialFall) => {
            ObservedPosture::LowHeight
        }
        Some(Posture::Standing) => ObservedPosture::Standing,
    };

    let trend = if !world_state.is_normal() && observed_posture == ObservedPosture::Standing {
        MovementTrend::Recovering
    } else if has_motion {
        MovementTrend::Unstable
    } else if observed_posture == ObservedPosture::OnFloor {
        MovementTrend::Still
    } else {
        MovementTrend::Stable
    };

    ObservedState::new(observed_posture, trend)
}
