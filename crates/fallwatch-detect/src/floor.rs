//! Floor-duration tracking
//!
//! A two-state reducer over the posture classification. Duration is measured
//! by comparing observation times; there are no timers.

use fallwatch_core::{Posture, Timestamp};

/// Floor classification configuration
#[derive(Clone, Debug)]
pub struct FloorConfig {
    /// Normalized hip-centre y above which the subject is classified on the floor
    pub floor_line: f64,
}

impl Default for FloorConfig {
    fn default() -> Self {
        FloorConfig { floor_line: 0.7 }
    }
}

impl FloorConfig {
    /// Classify a normalized vertical position (y grows downwards)
    pub fn classify(&self, hip_y: f64) -> Posture {
        if hip_y > self.floor_line {
            Posture::OnFloor
        } else {
            Posture::Standing
        }
    }
}

/// A posture change that enters or leaves the floor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostureTransition {
    pub from: Posture,
    pub to: Posture,
}

impl PostureTransition {
    #[inline]
    pub fn entered_floor(&self) -> bool {
        self.to.is_on_floor()
    }
}

/// Floor-duration tracker
#[derive(Clone, Debug, Default)]
pub struct FloorTracker {
    posture: Option<Posture>,
    floor_enter_time: Option<Timestamp>,
    on_floor_duration: f64,
    duration_fall_emitted: bool,
}

impl FloorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one classification. Returns the transition, if the floor was
    /// entered or left. The first classification is never a transition.
    pub fn update(&mut self, now: Timestamp, posture: Posture) -> Option<PostureTransition> {
        match posture {
            Posture::OnFloor => {
                let entered = *self.floor_enter_time.get_or_insert(now);
                self.on_floor_duration = now.secs_since(entered).max(0.0);
            }
            Posture::Standing => {
                self.floor_enter_time = None;
                self.on_floor_duration = 0.0;
                self.duration_fall_emitted = false;
            }
        }

        let previous = self.posture.replace(posture);
        match previous {
            Some(from) if from != posture => Some(PostureTransition { from, to: posture }),
            _ => None,
        }
    }

    pub fn posture(&self) -> Option<Posture> {
        self.posture
    }

    pub fn is_on_floor(&self) -> bool {
        self.posture.map(Posture::is_on_floor).unwrap_or(false)
    }

    pub fn floor_enter_time(&self) -> Option<Timestamp> {
        self.floor_enter_time
    }

    /// Continuous seconds on the floor, zero unless currently `ON_FLOOR`
    pub fn on_floor_duration(&self) -> f64 {
        self.on_floor_duration
    }

    pub fn duration_fall_emitted(&self) -> bool {
        self.duration_fall_emitted
    }

    /// Latch the per-episode confirmation flag
    pub fn mark_duration_fall_emitted(&mut self) {
        self.duration_fall_emitted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Timestamp {
        Timestamp::from_secs_f64(s)
    }

    #[test]
    fn test_classify_floor_line() {
        let config = FloorConfig::default();
        assert_eq!(config.classify(0.71), Posture::OnFloor);
        assert_eq!(config.classify(0.7), Posture::Standing);
        assert_eq!(config.classify(0.3), Posture::Standing);
    }

    #[test]
    fn test_duration_accumulates_while_on_floor() {
        let mut tracker = FloorTracker::new();
        assert_eq!(tracker.update(secs(0.0), Posture::Standing), None);
        let t = tracker.update(secs(1.0), Posture::OnFloor).unwrap();
        assert!(t.entered_floor());
        assert_eq!(tracker.floor_enter_time(), Some(secs(1.0)));
        assert_eq!(tracker.on_floor_duration(), 0.0);

        assert_eq!(tracker.update(secs(6.5), Posture::OnFloor), None);
        assert!((tracker.on_floor_duration() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_leaving_floor_resets_episode() {
        let mut tracker = FloorTracker::new();
        tracker.update(secs(0.0), Posture::OnFloor);
        tracker.update(secs(30.0), Posture::OnFloor);
        tracker.mark_duration_fall_emitted();

        let t = tracker.update(secs(31.0), Posture::Standing).unwrap();
        assert!(!t.entered_floor());
        assert_eq!(tracker.on_floor_duration(), 0.0);
        assert_eq!(tracker.floor_enter_time(), None);
        assert!(!tracker.duration_fall_emitted());
    }

    #[test]
    fn test_first_sample_on_floor_is_not_a_transition() {
        let mut tracker = FloorTracker::new();
        assert_eq!(tracker.update(secs(2.0), Posture::OnFloor), None);
        assert!(tracker.is_on_floor());
    }
}
