//! Scenario timelines
//!
//! A scenario is an initial posture plus a list of timed commands. `STATE`
//! switches the posture classification; `POSITION` sets the hip-centre
//! height, held until the next position command.

use std::path::Path;

use fallwatch_core::{FallwatchError, FallwatchResult, Posture};
use serde::{Deserialize, Serialize};

/// Simulated time past the last command
pub const RUN_OUT_SECS: f64 = 5.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub observed_state: Posture,
}

/// One timeline command
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    State { observed_state: Posture },
    Position { value: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Seconds since scenario start
    pub t: f64,
    #[serde(flatten)]
    pub command: Command,
}

/// Scenario definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    #[serde(default)]
    pub description: String,
    pub initial_state: InitialState,
    pub timeline: Vec<TimelineEntry>,
}

impl Scenario {
    pub fn from_json(text: &str) -> FallwatchResult<Self> {
        let mut scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        scenario.timeline.sort_by(|a, b| a.t.total_cmp(&b.t));
        Ok(scenario)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FallwatchResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> FallwatchResult<()> {
        if self.timeline.is_empty() {
            return Err(FallwatchError::invalid_config("timeline", "scenario has no commands"));
        }
        for entry in &self.timeline {
            if !(entry.t.is_finite() && entry.t >= 0.0) {
                return Err(FallwatchError::invalid_config(
                    "timeline",
                    format!("invalid command time {}", entry.t),
                ));
            }
            if let Command::Position { value } = entry.command {
                if !value.is_finite() {
                    return Err(FallwatchError::InvalidSample(format!(
                        "non-finite position at t={}",
                        entry.t
                    )));
                }
            }
        }
        Ok(())
    }

    /// Last simulated instant: last command plus the run-out
    pub fn end_time(&self) -> f64 {
        self.timeline
            .iter()
            .map(|e| e.t)
            .fold(0.0, f64::max)
            + RUN_OUT_SECS
    }
}

/// Fluent scenario construction for tests
#[derive(Clone, Debug)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn new(scenario_id: impl Into<String>) -> Self {
        ScenarioBuilder {
            scenario: Scenario {
                scenario_id: scenario_id.into(),
                description: String::new(),
                initial_state: InitialState {
                    observed_state: Posture::Standing,
                },
                timeline: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.scenario.description = description.into();
        self
    }

    pub fn state_at(mut self, t: f64, posture: Posture) -> Self {
        self.scenario.timeline.push(TimelineEntry {
            t,
            command: Command::State {
                observed_state: posture,
            },
        });
        self
    }

    pub fn position_at(mut self, t: f64, value: f64) -> Self {
        self.scenario.timeline.push(TimelineEntry {
            t,
            command: Command::Position { value },
        });
        self
    }

    pub fn build(mut self) -> FallwatchResult<Scenario> {
        self.scenario.validate()?;
        self.scenario.timeline.sort_by(|a, b| a.t.total_cmp(&b.t));
        Ok(self.scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "scenario_id": "fall_then_floor",
        "description": "Drop, then stay down",
        "initial_state": { "observed_state": "STANDING" },
        "timeline": [
            { "t": 12.0, "type": "STATE", "observed_state": "ON_FLOOR" },
            { "t": 3.0, "type": "POSITION", "value": 0.42 }
        ]
    }"#;

    #[test]
    fn test_parse_sorts_timeline() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        assert_eq!(scenario.timeline[0].t, 3.0);
        assert_eq!(scenario.timeline[0].command, Command::Position { value: 0.42 });
        assert_eq!(
            scenario.timeline[1].command,
            Command::State {
                observed_state: Posture::OnFloor
            }
        );
        assert_eq!(scenario.end_time(), 17.0);
    }

    #[test]
    fn test_unknown_command_rejected() {
        let text = SAMPLE.replace("\"POSITION\"", "\"TELEPORT\"");
        assert!(Scenario::from_json(&text).is_err());
    }

    #[test]
    fn test_empty_timeline_rejected() {
        assert!(ScenarioBuilder::new("empty").build().is_err());
    }

    #[test]
    fn test_negative_time_rejected() {
        assert!(ScenarioBuilder::new("bad")
            .state_at(-1.0, Posture::OnFloor)
            .build()
            .is_err());
    }
}
