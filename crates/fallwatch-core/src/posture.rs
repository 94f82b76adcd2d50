//! Posture classification and observed body state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FallwatchError;

/// Binary posture classification supplied by the perception layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Posture {
    Standing,
    OnFloor,
}

impl Posture {
    pub fn as_str(self) -> &'static str {
        match self {
            Posture::Standing => "STANDING",
            Posture::OnFloor => "ON_FLOOR",
        }
    }

    #[inline]
    pub fn is_on_floor(self) -> bool {
        matches!(self, Posture::OnFloor)
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Posture {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STANDING" => Ok(Posture::Standing),
            "ON_FLOOR" => Ok(Posture::OnFloor),
            _ => Err(FallwatchError::InvalidSample(format!("unknown posture: {}", s))),
        }
    }
}

/// Posture as summarised in a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedPosture {
    Standing,
    /// A drop was observed but the floor classifier has not confirmed it yet
    LowHeight,
    OnFloor,
    Unknown,
}

impl ObservedPosture {
    #[inline]
    pub fn is_low(self) -> bool {
        matches!(self, ObservedPosture::LowHeight | ObservedPosture::OnFloor)
    }
}

/// Movement trend over a snapshot window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementTrend {
    Stable,
    Unstable,
    Recovering,
    Still,
    Unknown,
}

impl MovementTrend {
    #[inline]
    pub fn signals_recovery(self) -> bool {
        matches!(self, MovementTrend::Stable | MovementTrend::Recovering)
    }
}

/// Observed world state attached to a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub posture: ObservedPosture,
    pub movement_trend: MovementTrend,
}

impl ObservedState {
    pub fn new(posture: ObservedPosture, movement_trend: MovementTrend) -> Self {
        ObservedState {
            posture,
            movement_trend,
        }
    }

    /// Recovery: trend is calm while the posture is no longer low
    pub fn recovery_detected(&self) -> bool {
        self.movement_trend.signals_recovery() && !self.posture.is_low()
    }
}

impl Default for ObservedState {
    fn default() -> Self {
        ObservedState::new(ObservedPosture::Unknown, MovementTrend::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posture_parse() {
        assert_eq!("on_floor".parse::<Posture>().unwrap(), Posture::OnFloor);
        assert_eq!("STANDING".parse::<Posture>().unwrap(), Posture::Standing);
        assert!("SITTING".parse::<Posture>().is_err());
    }

    #[test]
    fn test_recovery_requires_upright_posture() {
        let upright = ObservedState::new(ObservedPosture::Standing, MovementTrend::Stable);
        let low = ObservedState::new(ObservedPosture::LowHeight, MovementTrend::Recovering);
        assert!(upright.recovery_detected());
        assert!(!low.recovery_detected());
    }
}
