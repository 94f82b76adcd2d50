//! Scenario simulator
//!
//! Steps simulated time at a fixed 0.1 s resolution from zero to the
//! scenario end, feeding one perception sample per step into a [`Monitor`].
//! Timestamps are integer microseconds since the scenario start, so runs are
//! exactly reproducible.

use std::sync::Arc;
use std::time::Duration;

use fallwatch_core::{
    Action, Component, EventType, FallwatchResult, LogRecord, LogType, NullSink, Posture,
    RecordSink, Timestamp,
};
use fallwatch_decision::Arbiter;
use fallwatch_detect::PerceptionSample;
use fallwatch_runtime::{CycleReport, FallPipeline, Monitor, MonitorConfig, PipelineStats};
use serde_json::json;
use tracing::info;

use crate::{Command, Scenario};

/// Simulation step in microseconds
pub const STEP_MICROS: i64 = 100_000;

/// Everything a simulation run produced
#[derive(Clone, Debug)]
pub struct SimulationReport {
    pub scenario_id: String,
    pub cycles: Vec<CycleReport>,
    pub stats: PipelineStats,
    pub steps: u64,
    pub simulated_seconds: f64,
}

impl SimulationReport {
    pub fn decisions(&self) -> Vec<Action> {
        self.cycles.iter().map(|c| c.decision.action).collect()
    }

    /// Events of one type across all cycles
    pub fn event_count(&self, event_type: EventType) -> usize {
        self.cycles.iter().map(|c| c.snapshot.event_count(event_type)).sum()
    }

    pub fn messages_sent(&self) -> Vec<&CycleReport> {
        self.cycles.iter().filter(|c| c.policy.is_send()).collect()
    }
}

/// Deterministic scenario runner
pub struct Simulator {
    scenario: Scenario,
    config: MonitorConfig,
    arbiter: Option<Arbiter>,
    sink: Arc<dyn RecordSink>,
    speed_factor: f64,
}

impl Simulator {
    pub fn new(scenario: Scenario, config: MonitorConfig) -> Self {
        Simulator {
            scenario,
            config,
            arbiter: None,
            sink: Arc::new(NullSink),
            speed_factor: 0.0,
        }
    }

    /// Use an explicit arbiter instead of the configured one
    pub fn with_arbiter(mut self, arbiter: Arbiter) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Real seconds slept per simulated second; zero runs flat out
    pub fn with_speed_factor(mut self, speed_factor: f64) -> Self {
        self.speed_factor = speed_factor.max(0.0);
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub async fn run(self) -> FallwatchResult<SimulationReport> {
        let Simulator {
            scenario,
            config,
            arbiter,
            sink,
            speed_factor,
        } = self;

        let pipeline = match arbiter {
            Some(arbiter) => FallPipeline::with_arbiter(&config, arbiter),
            None => FallPipeline::from_config(&config)?,
        }
        .with_sink(Arc::clone(&sink));
        let mut monitor = Monitor::new(pipeline, config.ingest_capacity);

        info!(scenario = %scenario.scenario_id, "simulation started");
        sink.emit(LogRecord::new(
            LogType::SimulationStart,
            Component::Simulator,
            "sim-start",
            json!({
                "scenario_id": scenario.scenario_id,
                "description": scenario.description,
            }),
        ));

        let end = Timestamp::from_secs_f64(scenario.end_time());
        let pacing = Duration::from_micros(STEP_MICROS as u64).mul_f64(speed_factor);
        let mut posture: Posture = scenario.initial_state.observed_state;
        let mut position: Option<f64> = None;
        let mut next = 0;
        let mut cycles = Vec::new();
        let mut step: i64 = 0;

        loop {
            let now = Timestamp::from_micros(step * STEP_MICROS);
            if now > end {
                break;
            }

            while let Some(entry) = scenario.timeline.get(next) {
                if Timestamp::from_secs_f64(entry.t) > now {
                    break;
                }
                match entry.command {
                    Command::State { observed_state } => {
                        posture = observed_state;
                        info!(t = entry.t, %posture, "state injected");
                        sink.emit(LogRecord::new(
                            LogType::SimulationEvent,
                            Component::Simulator,
                            format!("sim-evt-{}", next),
                            json!({ "t": entry.t, "injected_state": posture }),
                        ));
                    }
                    Command::Position { value } => {
                        position = Some(value);
                        sink.emit(LogRecord::new(
                            LogType::SimulationEvent,
                            Component::Simulator,
                            format!("sim-evt-{}", next),
                            json!({ "t": entry.t, "injected_position": value }),
                        ));
                    }
                }
                next += 1;
            }

            let sample = PerceptionSample {
                timestamp: now,
                posture,
                position,
            };
            if let Some(cycle) = monitor.step(&sample).await {
                cycles.push(cycle);
            }

            step += 1;
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }

        let simulated_seconds = Timestamp::from_micros((step - 1).max(0) * STEP_MICROS).as_secs_f64();
        sink.emit(LogRecord::new(
            LogType::SimulationEnd,
            Component::Simulator,
            "sim-end",
            json!({
                "scenario_id": scenario.scenario_id,
                "duration_sim": simulated_seconds,
            }),
        ));
        info!(
            scenario = %scenario.scenario_id,
            cycles = cycles.len(),
            steps = step,
            "simulation complete"
        );

        Ok(SimulationReport {
            scenario_id: scenario.scenario_id,
            stats: monitor.stats().clone(),
            cycles,
            steps: step as u64,
            simulated_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fallwatch_core::{MemorySink, SubjectId};

    use crate::ScenarioBuilder;

    #[tokio::test]
    async fn test_steps_until_run_out() {
        let scenario = ScenarioBuilder::new("quiet")
            .state_at(1.0, Posture::Standing)
            .build()
            .unwrap();
        let sink = Arc::new(MemorySink::new());
        let report = Simulator::new(scenario, MonitorConfig::simulation(SubjectId::new(1)))
            .with_sink(sink.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.steps, 61);
        assert_eq!(report.stats.ticks, 61);
        assert_eq!(report.simulated_seconds, 6.0);
        assert_eq!(sink.count(LogType::SimulationStart), 1);
        assert_eq!(sink.count(LogType::SimulationEvent), 1);
        assert_eq!(sink.count(LogType::SimulationEnd), 1);
        assert!(report.cycles.is_empty());
    }

    #[tokio::test]
    async fn test_pacing_slows_the_run() {
        let scenario = ScenarioBuilder::new("paced")
            .state_at(0.0, Posture::Standing)
            .build()
            .unwrap();
        let started = std::time::Instant::now();
        Simulator::new(scenario, MonitorConfig::simulation(SubjectId::new(1)))
            .with_speed_factor(0.01)
            .run()
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
