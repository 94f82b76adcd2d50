//! Composite event correlation
//!
//! Derives fall hypotheses from atomic observations and floor duration.
//! Composite events carry the ids of the atomic events that triggered them.

use std::time::Duration;

use fallwatch_core::{Event, EventKind, IdSequence, Posture, Severity, Timestamp};
use tracing::{debug, info};

use crate::FloorTracker;

/// Correlator configuration
#[derive(Clone, Debug)]
pub struct CorrelatorConfig {
    /// POTENTIAL_FALL fires when dy exceeds the atomic threshold times this factor
    pub potential_fall_factor: f64,
    pub potential_fall_confidence: f64,
    /// Continuous floor time that confirms a fall (T_confirm)
    pub confirm_after: Duration,
    pub duration_confidence: f64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        CorrelatorConfig {
            potential_fall_factor: 1.5,
            potential_fall_confidence: 0.85,
            confirm_after: Duration::from_secs(25),
            duration_confidence: 0.95,
        }
    }
}

/// Composite event correlator
#[derive(Clone, Debug, Default)]
pub struct Correlator {
    config: CorrelatorConfig,
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Correlator { config }
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Motion-only early warning, evaluated against the atomic observation
    /// emitted on this tick.
    pub fn potential_fall(&self, atomic: &Event, ids: &mut IdSequence) -> Option<Event> {
        let (dy, dt, threshold) = match atomic.kind {
            EventKind::RapidVerticalMovement {
                dy, dt, threshold, ..
            } => (dy, dt, threshold),
            _ => return None,
        };
        if dy <= threshold * self.config.potential_fall_factor {
            return None;
        }

        let event = Event::new(
            ids.next_event(),
            EventKind::PotentialFall {
                trigger_dy: dy,
                time_window: dt,
            },
            atomic.timestamp,
        )
        .with_chain(vec![atomic.id])
        .with_confidence(self.config.potential_fall_confidence)
        .with_severity(Severity::High);

        debug!(event = %event.id, trigger = %atomic.id, dy, "potential fall");
        Some(event)
    }

    /// Duration confirmation, at most once per continuous floor episode
    pub fn confirm_by_duration(
        &self,
        now: Timestamp,
        floor: &mut FloorTracker,
        ids: &mut IdSequence,
    ) -> Option<Event> {
        let duration = floor.on_floor_duration();
        let eligible = floor.posture() == Some(Posture::OnFloor)
            && duration >= self.config.confirm_after.as_secs_f64()
            && !floor.duration_fall_emitted();
        if !eligible {
            return None;
        }

        floor.mark_duration_fall_emitted();
        let event = Event::new(
            ids.next_event(),
            EventKind::ConfirmedFallByDuration {
                on_floor_duration: duration,
            },
            now,
        )
        .with_confidence(self.config.duration_confidence)
        .with_severity(Severity::High);

        info!(
            event = %event.id,
            on_floor_duration = duration,
            threshold = self.config.confirm_after.as_secs_f64(),
            "fall confirmed by floor duration"
        );
        Some(event)
    }
}
