//! Detection stage - the per-tick half of the pipeline
//!
//! Order within a tick: motion observation, motion-only composite, floor
//! update, duration composite. The stage owns all per-tick state and is
//! driven by exactly one caller.

use fallwatch_core::{
    Event, FallwatchError, FallwatchResult, IdSequence, Posture, Timestamp, TriggerReason,
};

use crate::{
    AtomicDetector, Correlator, CorrelatorConfig, DetectorConfig, FloorTracker, PerceptionSample,
    PostureTransition,
};

/// Everything one tick produced
#[derive(Clone, Debug)]
pub struct TickObservation {
    pub timestamp: Timestamp,
    pub posture: Posture,
    /// New events in emission order (atomic before the composites it triggers)
    pub events: Vec<Event>,
    pub transition: Option<PostureTransition>,
    /// Set when a composite rule fired; duration confirmation wins over motion
    pub critical: Option<TriggerReason>,
    pub on_floor_duration: f64,
}

/// Detection stage
#[derive(Clone, Debug)]
pub struct DetectionStage {
    detector: AtomicDetector,
    floor: FloorTracker,
    correlator: Correlator,
    last_timestamp: Option<Timestamp>,
}

impl DetectionStage {
    pub fn new(detector: DetectorConfig, correlator: CorrelatorConfig) -> Self {
        DetectionStage {
            detector: AtomicDetector::new(detector),
            floor: FloorTracker::new(),
            correlator: Correlator::new(correlator),
            last_timestamp: None,
        }
    }

    pub fn floor(&self) -> &FloorTracker {
        &self.floor
    }

    pub fn detector(&self) -> &AtomicDetector {
        &self.detector
    }

    /// Process one sample to completion
    pub fn process(
        &mut self,
        sample: &PerceptionSample,
        ids: &mut IdSequence,
    ) -> FallwatchResult<TickObservation> {
        sample.validate()?;
        let now = sample.timestamp;
        if let Some(previous) = self.last_timestamp {
            if now < previous {
                return Err(FallwatchError::TimeWentBackwards {
                    previous,
                    current: now,
                });
            }
        }
        self.last_timestamp = Some(now);

        let mut events = Vec::new();
        let mut critical = None;

        if let Some(position) = sample.position {
            if let Some(atomic) = self.detector.observe(now, position, ids) {
                let composite = self.correlator.potential_fall(&atomic, ids);
                events.push(atomic);
                if let Some(composite) = composite {
                    events.push(composite);
                    critical = Some(TriggerReason::CriticalEvent);
                }
            }
        }

        let transition = self.floor.update(now, sample.posture);

        if let Some(confirmed) = self.correlator.confirm_by_duration(now, &mut self.floor, ids) {
            events.push(confirmed);
            critical = Some(TriggerReason::ConfirmedFallByDuration);
        }

        Ok(TickObservation {
            timestamp: now,
            posture: sample.posture,
            events,
            transition,
            critical,
            on_floor_duration: self.floor.on_floor_duration(),
        })
    }
}

impl Default for DetectionStage {
    fn default() -> Self {
        Self::new(DetectorConfig::default(), CorrelatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fallwatch_core::{EventType, SubjectId};

    fn secs(s: f64) -> Timestamp {
        Timestamp::from_secs_f64(s)
    }

    #[test]
    fn test_rapid_drop_yields_atomic_and_composite() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut stage = DetectionStage::default();
        stage
            .process(&PerceptionSample::new(secs(5.0), Posture::Standing, 0.40), &mut ids)
            .unwrap();
        let tick = stage
            .process(&PerceptionSample::new(secs(5.2), Posture::Standing, 0.70), &mut ids)
            .unwrap();

        let types: Vec<_> = tick.events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![EventType::RapidVerticalMovement, EventType::PotentialFall]
        );
        assert_eq!(tick.events[1].event_chain, vec![tick.events[0].id]);
        assert_eq!(tick.critical, Some(TriggerReason::CriticalEvent));
    }

    #[test]
    fn test_floor_entry_reports_transition() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut stage = DetectionStage::default();
        stage
            .process(&PerceptionSample::state(secs(0.0), Posture::Standing), &mut ids)
            .unwrap();
        let tick = stage
            .process(&PerceptionSample::state(secs(0.1), Posture::OnFloor), &mut ids)
            .unwrap();
        assert!(tick.transition.unwrap().entered_floor());
        assert!(tick.events.is_empty());
        assert_eq!(tick.critical, None);
    }

    #[test]
    fn test_duration_confirmation_marks_critical() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut stage = DetectionStage::default();
        let mut confirmations = 0;
        for tenth in 0..=260 {
            let sample = PerceptionSample::state(Timestamp::from_millis(tenth * 100), Posture::OnFloor);
            let tick = stage.process(&sample, &mut ids).unwrap();
            if tick.critical == Some(TriggerReason::ConfirmedFallByDuration) {
                confirmations += 1;
                assert!((tick.on_floor_duration - 25.0).abs() < 1e-9);
            }
        }
        assert_eq!(confirmations, 1);
    }

    #[test]
    fn test_time_going_backwards_rejected() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut stage = DetectionStage::default();
        stage
            .process(&PerceptionSample::state(secs(2.0), Posture::Standing), &mut ids)
            .unwrap();
        let result = stage.process(&PerceptionSample::state(secs(1.0), Posture::Standing), &mut ids);
        assert!(matches!(result, Err(FallwatchError::TimeWentBackwards { .. })));
    }
}
