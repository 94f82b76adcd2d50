//! Atomic event detection
//!
//! Converts consecutive vertical-position samples into
//! `RAPID_VERTICAL_MOVEMENT` observations.

use std::time::Duration;

use fallwatch_core::{Event, EventKind, IdSequence, Severity, Timestamp};
use tracing::debug;

/// Atomic detector configuration
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Minimum downward displacement between two samples (normalized units)
    pub displacement_threshold: f64,
    /// Samples further apart than this are treated as a gap, not motion
    pub max_interval: Duration,
    /// Minimum spacing between two emitted observations
    pub cooldown: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            displacement_threshold: 0.18,
            max_interval: Duration::from_millis(600),
            cooldown: Duration::from_secs(2),
        }
    }
}

/// Atomic event detector
#[derive(Clone, Debug)]
pub struct AtomicDetector {
    config: DetectorConfig,
    previous: Option<(Timestamp, f64)>,
    last_event_time: Option<Timestamp>,
}

impl AtomicDetector {
    pub fn new(config: DetectorConfig) -> Self {
        AtomicDetector {
            config,
            previous: None,
            last_event_time: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn last_event_time(&self) -> Option<Timestamp> {
        self.last_event_time
    }

    fn cooldown_elapsed(&self, now: Timestamp) -> bool {
        match self.last_event_time {
            Some(last) => now - last >= self.config.cooldown,
            None => true,
        }
    }

    /// Feed one sample; returns an observation when displacement, interval
    /// and cooldown conditions all hold.
    pub fn observe(&mut self, now: Timestamp, position: f64, ids: &mut IdSequence) -> Option<Event> {
        let previous = self.previous.replace((now, position));
        let (prev_time, prev_position) = previous?;

        let dy = position - prev_position;
        let dt = now.secs_since(prev_time);
        let threshold = self.config.displacement_threshold;

        let triggered = dy > threshold
            && dt < self.config.max_interval.as_secs_f64()
            && self.cooldown_elapsed(now);
        if !triggered {
            return None;
        }

        let velocity = if dt > 0.0 { dy / dt } else { 0.0 };
        let confidence = (dy.abs() / (2.0 * threshold)).min(1.0);
        self.last_event_time = Some(now);

        let event = Event::new(
            ids.next_event(),
            EventKind::RapidVerticalMovement {
                dy,
                dt,
                velocity,
                threshold,
            },
            now,
        )
        .with_confidence(confidence)
        .with_severity(Severity::Medium);

        debug!(event = %event.id, dy, dt, confidence, "rapid vertical movement");
        Some(event)
    }

    /// Forget the previous sample, e.g. after the subject was lost
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for AtomicDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
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
    fn test_no_event_on_first_sample() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut detector = AtomicDetector::default();
        assert!(detector.observe(secs(0.0), 0.9, &mut ids).is_none());
    }

    #[test]
    fn test_rapid_drop_emits_observation() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut detector = AtomicDetector::default();
        detector.observe(secs(10.0), 0.40, &mut ids);
        let event = detector.observe(secs(10.2), 0.70, &mut ids).unwrap();

        assert_eq!(event.event_type(), EventType::RapidVerticalMovement);
        assert!((event.confidence_hint - 0.30 / 0.36).abs() < 1e-9);
        match event.kind {
            EventKind::RapidVerticalMovement { dy, dt, velocity, .. } => {
                assert!((dy - 0.30).abs() < 1e-9);
                assert!((dt - 0.2).abs() < 1e-9);
                assert!((velocity - 1.5).abs() < 1e-9);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(detector.last_event_time(), Some(secs(10.2)));
    }

    #[test]
    fn test_gap_suppresses_detection() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut detector = AtomicDetector::default();
        detector.observe(secs(0.0), 0.3, &mut ids);
        assert!(detector.observe(secs(0.8), 0.8, &mut ids).is_none());
    }

    #[test]
    fn test_upward_motion_ignored() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut detector = AtomicDetector::default();
        detector.observe(secs(0.0), 0.8, &mut ids);
        assert!(detector.observe(secs(0.1), 0.3, &mut ids).is_none());
    }

    #[test]
    fn test_cooldown_between_observations() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut detector = AtomicDetector::default();
        detector.observe(secs(0.0), 0.1, &mut ids);
        assert!(detector.observe(secs(0.1), 0.4, &mut ids).is_some());
        detector.observe(secs(0.2), 0.1, &mut ids);
        assert!(detector.observe(secs(0.3), 0.4, &mut ids).is_none());
        detector.observe(secs(2.0), 0.1, &mut ids);
        assert!(detector.observe(secs(2.1), 0.4, &mut ids).is_some());
    }

    #[test]
    fn test_confidence_capped() {
        let mut ids = IdSequence::new(SubjectId::new(1));
        let mut detector = AtomicDetector::default();
        detector.observe(secs(0.0), 0.0, &mut ids);
        let event = detector.observe(secs(0.1), 0.9, &mut ids).unwrap();
        assert_eq!(event.confidence_hint, 1.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn observations_respect_threshold_and_cooldown(
                moves in prop::collection::vec((1u32..1_000, -0.5f64..0.5), 1..80)
            ) {
                let mut ids = IdSequence::new(SubjectId::new(4));
                let mut detector = AtomicDetector::default();
                let mut now = 0i64;
                let mut position = 0.5f64;
                let mut last_emitted: Option<Timestamp> = None;
                detector.observe(Timestamp::ZERO, position, &mut ids);

                for (gap_ms, dy) in moves {
                    now += gap_ms as i64 * 1_000;
                    position += dy;
                    let at = Timestamp::from_micros(now);
                    if let Some(event) = detector.observe(at, position, &mut ids) {
                        match event.kind {
                            EventKind::RapidVerticalMovement { dy, dt, threshold, .. } => {
                                prop_assert!(dy > threshold);
                                prop_assert!(dt < 0.6);
                            }
                            _ => prop_assert!(false, "unexpected kind"),
                        }
                        prop_assert!((0.0..=1.0).contains(&event.confidence_hint));
                        if let Some(previous) = last_emitted {
                            prop_assert!(at.secs_since(previous) >= 2.0);
                        }
                        last_emitted = Some(at);
                    }
                }
            }
        }
    }
}
