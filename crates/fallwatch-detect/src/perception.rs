//! Perception adapter
//!
//! The pose model is a black box producing normalized body landmarks per
//! frame. Only the hip centre is used: its vertical position feeds the atomic
//! detector and its height against the floor line gives the posture.

use fallwatch_core::{FallwatchError, FallwatchResult, Posture, Timestamp};
use serde::{Deserialize, Serialize};

use crate::FloorConfig;

/// Landmark indices of the 33-point body topology
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;

/// Normalized landmark (0..1 image coordinates, y grows downwards)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Landmark {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }
}

/// One tick of perception input
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerceptionSample {
    pub timestamp: Timestamp,
    pub posture: Posture,
    /// Vertical reference position; absent for state-only updates
    pub position: Option<f64>,
}

impl PerceptionSample {
    pub fn new(timestamp: Timestamp, posture: Posture, position: f64) -> Self {
        PerceptionSample {
            timestamp,
            posture,
            position: Some(position),
        }
    }

    /// State-only update without a position sample
    pub fn state(timestamp: Timestamp, posture: Posture) -> Self {
        PerceptionSample {
            timestamp,
            posture,
            position: None,
        }
    }

    /// Build a sample from one frame of landmarks
    pub fn from_landmarks(
        timestamp: Timestamp,
        landmarks: &[Landmark],
        floor: &FloorConfig,
    ) -> FallwatchResult<Self> {
        let (left, right) = match (landmarks.get(LEFT_HIP), landmarks.get(RIGHT_HIP)) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                return Err(FallwatchError::InvalidSample(format!(
                    "expected at least {} landmarks, got {}",
                    RIGHT_HIP + 1,
                    landmarks.len()
                )))
            }
        };
        let hip_y = (left.y + right.y) / 2.0;
        let sample = PerceptionSample::new(timestamp, floor.classify(hip_y), hip_y);
        sample.validate()?;
        Ok(sample)
    }

    /// Reject non-finite positions
    pub fn validate(&self) -> FallwatchResult<()> {
        match self.position {
            Some(p) if !p.is_finite() => Err(FallwatchError::InvalidSample(format!(
                "non-finite position {} at {:?}",
                p, self.timestamp
            ))),
            _ => Ok(()),
        }
    }
}
