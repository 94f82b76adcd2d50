//! Snapshot trigger and dedup controller
//!
//! Decides once per tick whether a snapshot cycle runs. Priority is
//! critical event, then floor state change, then timer. A forced snapshot
//! that repeats the previous posture and trigger reason is skipped, except
//! for timer heartbeats and critical events.

use std::time::Duration;

use fallwatch_core::{Posture, Timestamp, TriggerReason};
use fallwatch_detect::TickObservation;
use tracing::trace;

/// Trigger configuration
#[derive(Clone, Debug)]
pub struct TriggerConfig {
    /// Heartbeat interval between snapshots
    pub interval: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig {
            interval: Duration::from_secs(10),
        }
    }
}

/// Outcome of one trigger evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Nothing forces a snapshot this tick
    Idle,
    /// Run a full cycle
    Run(TriggerReason),
    /// A snapshot was forced but is redundant with the previous one
    Skip(TriggerReason),
}

impl TriggerOutcome {
    pub fn reason(self) -> Option<TriggerReason> {
        match self {
            TriggerOutcome::Idle => None,
            TriggerOutcome::Run(reason) | TriggerOutcome::Skip(reason) => Some(reason),
        }
    }

    #[inline]
    pub fn runs(self) -> bool {
        matches!(self, TriggerOutcome::Run(_))
    }
}

/// Snapshot trigger state
#[derive(Clone, Debug, Default)]
pub struct SnapshotTrigger {
    config: TriggerConfig,
    last_snapshot_time: Option<Timestamp>,
    last_posture: Option<Posture>,
    last_reason: Option<TriggerReason>,
    critical: Option<TriggerReason>,
    state_changed: bool,
}

impl SnapshotTrigger {
    pub fn new(config: TriggerConfig) -> Self {
        SnapshotTrigger {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Latch the flags raised by one tick of detection
    pub fn note(&mut self, tick: &TickObservation) {
        if let Some(reason) = tick.critical {
            // a duration confirmation outranks a motion warning in the same window
            if self.critical != Some(TriggerReason::ConfirmedFallByDuration) {
                self.critical = Some(reason);
            }
        }
        if tick.transition.is_some() {
            self.state_changed = true;
        }
    }

    /// Evaluate the trigger for the current tick and reset the per-cycle flags
    /// whenever a snapshot was forced, skipped or not.
    pub fn evaluate(&mut self, now: Timestamp, posture: Posture) -> TriggerOutcome {
        let last = *self.last_snapshot_time.get_or_insert(now);

        let reason = if let Some(reason) = self.critical {
            reason
        } else if self.state_changed {
            TriggerReason::StateChange
        } else if now.secs_since(last) >= self.config.interval.as_secs_f64() {
            TriggerReason::Timer
        } else {
            return TriggerOutcome::Idle;
        };

        let redundant = self.last_posture == Some(posture)
            && self.last_reason == Some(reason)
            && reason != TriggerReason::Timer
            && self.critical.is_none();

        self.critical = None;
        self.state_changed = false;
        self.last_snapshot_time = Some(now);

        if redundant {
            trace!(%posture, %reason, "redundant snapshot skipped");
            return TriggerOutcome::Skip(reason);
        }

        self.last_posture = Some(posture);
        self.last_reason = Some(reason);
        TriggerOutcome::Run(reason)
    }

    pub fn last_snapshot_time(&self) -> Option<Timestamp> {
        self.last_snapshot_time
    }

    pub fn last_posture(&self) -> Option<Posture> {
        self.last_posture
    }

    pub fn last_reason(&self) -> Option<TriggerReason> {
        self.last_reason
    }
}
