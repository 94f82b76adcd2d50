//! Scenario fixtures
//!
//! Canonical timelines shared by the integration tests and the demo binary.
//! Positions are normalized image heights of the hip centre, so a larger
//! value is lower in the frame.

use fallwatch_core::Posture;

use crate::{Scenario, ScenarioBuilder};

/// Hip height while standing
pub const STANDING_HIP: f64 = 0.40;
/// Hip height after a drop of 0.30
pub const DROPPED_HIP: f64 = 0.70;

fn build(builder: ScenarioBuilder) -> Scenario {
    builder.build().unwrap_or_else(|e| panic!("fixture is valid: {e}"))
}

// ============================================================================
// Baseline
// ============================================================================

/// Standing still for 30 s; only timer heartbeats
pub fn quiet_standing() -> Scenario {
    build(
        ScenarioBuilder::new("quiet_standing")
            .description("Subject stands still")
            .position_at(0.0, STANDING_HIP)
            .state_at(25.0, Posture::Standing),
    )
}

/// Three sub-fall wobbles spaced past the cooldown
pub fn repeated_wobbles() -> Scenario {
    build(
        ScenarioBuilder::new("repeated_wobbles")
            .description("Unsteady subject, no fall")
            .position_at(0.0, 0.40)
            .position_at(1.0, 0.60)
            .position_at(2.0, 0.40)
            .position_at(3.5, 0.60)
            .position_at(4.0, 0.40)
            .position_at(6.0, 0.60),
    )
}

// ============================================================================
// Falls
// ============================================================================

/// Rapid drop at 5 s while the classifier still reports standing
pub fn rapid_drop() -> Scenario {
    build(
        ScenarioBuilder::new("rapid_drop")
            .description("Sudden descent, posture unchanged")
            .position_at(0.0, STANDING_HIP)
            .position_at(5.0, DROPPED_HIP),
    )
}

/// Drop at 5 s, then on the floor until past the confirmation threshold
pub fn prolonged_floor() -> Scenario {
    build(
        ScenarioBuilder::new("prolonged_floor")
            .description("Fall followed by prolonged floor time")
            .position_at(0.0, STANDING_HIP)
            .position_at(5.0, DROPPED_HIP)
            .state_at(5.0, Posture::OnFloor)
            .state_at(30.0, Posture::OnFloor),
    )
}

/// Drop at 5 s, back on the feet at 8 s
pub fn fall_and_recover() -> Scenario {
    build(
        ScenarioBuilder::new("fall_and_recover")
            .description("Fall with quick recovery")
            .position_at(0.0, STANDING_HIP)
            .position_at(5.0, DROPPED_HIP)
            .state_at(5.0, Posture::OnFloor)
            .state_at(8.0, Posture::Standing)
            .position_at(8.0, STANDING_HIP),
    )
}

/// Lying down from 2 s, then a rapid drop at 20 s while still on the floor
pub fn fall_while_down() -> Scenario {
    build(
        ScenarioBuilder::new("fall_while_down")
            .description("Second descent after 18 s on the floor")
            .state_at(2.0, Posture::OnFloor)
            .position_at(19.9, STANDING_HIP)
            .position_at(20.0, DROPPED_HIP),
    )
}

/// Every fixture, for smoke runs
pub fn all() -> Vec<Scenario> {
    vec![
        quiet_standing(),
        repeated_wobbles(),
        rapid_drop(),
        prolonged_floor(),
        fall_and_recover(),
        fall_while_down(),
    ]
}
