//! Fall pipeline - one tick at a time
//!
//! The pipeline owns every piece of mutable state for one subject: id
//! sequence, detection stage, trigger, and the event buffer accumulated
//! since the last cycle. Each tick runs to completion before the next one
//! is accepted.

use std::sync::Arc;

use fallwatch_analysis::{SnapshotEngine, SnapshotRequest};
use fallwatch_core::{
    invariants, ArbiterResult, Component, Decision, Event, EventType, FallwatchResult, IdSequence,
    LogRecord, LogType, NullSink, PolicyResult, RecordSink, Snapshot, SnapshotId, SubjectId,
    Timestamp, TriggerReason,
};
use fallwatch_decision::{Arbiter, CommunicationPolicy, DecisionEngine};
use fallwatch_detect::{DetectionStage, FloorConfig, Landmark, PerceptionSample, TickObservation};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{ArtifactKind, ArtifactStore, MonitorConfig, SnapshotTrigger, TriggerOutcome};

/// Every artifact of one snapshot cycle, correlated by the snapshot id
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub snapshot: Snapshot,
    pub decision: Decision,
    pub arbiter: ArbiterResult,
    pub policy: PolicyResult,
}

impl CycleReport {
    #[inline]
    pub fn snapshot_id(&self) -> SnapshotId {
        self.snapshot.id
    }

    #[inline]
    pub fn trigger(&self) -> TriggerReason {
        self.snapshot.trigger_reason
    }
}

/// Result of one tick
#[derive(Clone, Debug)]
pub struct TickOutcome {
    pub observation: TickObservation,
    pub trigger: TriggerOutcome,
    pub cycle: Option<CycleReport>,
}

#[derive(Clone, Debug, Default)]
pub struct PipelineStats {
    pub ticks: u64,
    pub rejected_samples: u64,
    pub atomic_events: u64,
    pub composite_events: u64,
    pub cycles: u64,
    pub skipped_cycles: u64,
    pub messages_authorised: u64,
}

/// Sequential fall-detection pipeline
pub struct FallPipeline {
    ids: IdSequence,
    floor: FloorConfig,
    detection: DetectionStage,
    trigger: SnapshotTrigger,
    buffer: Vec<Event>,
    snapshots: SnapshotEngine,
    decisions: DecisionEngine,
    arbiter: Arbiter,
    policy: CommunicationPolicy,
    sink: Arc<dyn RecordSink>,
    store: Option<ArtifactStore>,
    duration_confirmations: usize,
    last_snapshot: Option<SnapshotId>,
    stats: PipelineStats,
    #[cfg(test)]
    fault: Option<fallwatch_core::Invariant>,
}

impl FallPipeline {
    /// Build every stage from configuration. Fails only when the arbiter
    /// backend cannot be constructed.
    pub fn from_config(config: &MonitorConfig) -> FallwatchResult<Self> {
        let arbiter = Arbiter::from_config(config.arbiter.clone())?;
        Ok(Self::with_arbiter(config, arbiter))
    }

    /// Build with an explicit arbiter
    pub fn with_arbiter(config: &MonitorConfig, arbiter: Arbiter) -> Self {
        let subject = config.subject.unwrap_or_else(SubjectId::random);
        info!(%subject, provider = arbiter.provider_name(), "pipeline initialised");
        FallPipeline {
            ids: IdSequence::new(subject),
            floor: config.floor.clone(),
            detection: DetectionStage::new(config.detector.clone(), config.correlator.clone()),
            trigger: SnapshotTrigger::new(config.trigger.clone()),
            buffer: Vec::new(),
            snapshots: SnapshotEngine::new(config.snapshot.clone()),
            decisions: DecisionEngine::new(config.decision.clone()),
            arbiter,
            policy: CommunicationPolicy::new(config.policy.clone()),
            sink: Arc::new(NullSink),
            store: config.store.clone().map(ArtifactStore::new),
            duration_confirmations: 0,
            last_snapshot: None,
            stats: PipelineStats::default(),
            #[cfg(test)]
            fault: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn subject(&self) -> SubjectId {
        self.ids.subject()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Events waiting for the next cycle
    pub fn pending_events(&self) -> &[Event] {
        &self.buffer
    }

    pub fn detection(&self) -> &DetectionStage {
        &self.detection
    }

    pub fn trigger(&self) -> &SnapshotTrigger {
        &self.trigger
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Adapt one frame of pose landmarks and process it
    pub async fn tick_landmarks(
        &mut self,
        timestamp: Timestamp,
        landmarks: &[Landmark],
    ) -> FallwatchResult<TickOutcome> {
        let sample = match PerceptionSample::from_landmarks(timestamp, landmarks, &self.floor) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.rejected_samples += 1;
                return Err(e);
            }
        };
        self.tick(&sample).await
    }

    /// Process one sample to completion
    pub async fn tick(&mut self, sample: &PerceptionSample) -> FallwatchResult<TickOutcome> {
        let observation = match self.detection.process(sample, &mut self.ids) {
            Ok(observation) => observation,
            Err(e) => {
                self.stats.rejected_samples += 1;
                warn!(error = %e, "sample rejected");
                return Err(e);
            }
        };
        self.stats.ticks += 1;

        if let Some(transition) = observation.transition {
            info!(from = %transition.from, to = %transition.to, "posture transition");
            if !transition.entered_floor() {
                self.duration_confirmations = 0;
            }
        }

        for event in &observation.events {
            self.record_event(event)?;
        }
        self.buffer.extend(observation.events.iter().cloned());
        let expected = self.buffer.len();

        self.trigger.note(&observation);
        let outcome = self.trigger.evaluate(observation.timestamp, observation.posture);

        let cycle = match outcome {
            TriggerOutcome::Idle => None,
            TriggerOutcome::Skip(reason) => {
                self.stats.skipped_cycles += 1;
                debug!(%reason, pending = self.buffer.len(), "snapshot skipped");
                self.sink.emit(LogRecord::new(
                    LogType::SnapshotSkipped,
                    Component::SnapshotTrigger,
                    self.last_snapshot
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                    json!({
                        "trigger_reason": reason,
                        "posture": observation.posture,
                        "pending_events": self.buffer.len(),
                        "at": observation.timestamp,
                    }),
                ));
                None
            }
            TriggerOutcome::Run(reason) => Some(self.run_cycle(&observation, reason).await?),
        };

        let cleared = self.buffer.is_empty() && (outcome.runs() || expected > 0);
        invariants::check_buffer_clear(outcome.runs(), cleared)?;

        Ok(TickOutcome {
            observation,
            trigger: outcome,
            cycle,
        })
    }

    fn record_event(&mut self, event: &Event) -> FallwatchResult<()> {
        let (log_type, component) = if event.is_composite() {
            self.stats.composite_events += 1;
            (LogType::CompositeEvent, Component::EventCorrelator)
        } else {
            self.stats.atomic_events += 1;
            (LogType::AtomicEvent, Component::EventDetector)
        };

        if event.event_type() == EventType::ConfirmedFallByDuration {
            self.duration_confirmations += 1;
            invariants::check_duration_confirmations(self.duration_confirmations)?;
        }

        info!(event = %event.id, event_type = %event.event_type(), "event");
        self.sink
            .emit(LogRecord::from_artifact(log_type, component, event.id, event));
        self.persist(
            ArtifactKind::Event,
            event.timestamp,
            Some(event.event_type().as_str()),
            event,
        );
        Ok(())
    }

    async fn run_cycle(
        &mut self,
        observation: &TickObservation,
        reason: TriggerReason,
    ) -> FallwatchResult<CycleReport> {
        let now = observation.timestamp;

        // the buffer is only cleared once every stage of the cycle succeeded
        let snapshot = self.snapshots.build(
            SnapshotRequest {
                events: &self.buffer,
                now,
                trigger: reason,
                posture: Some(observation.posture),
                on_floor_duration: observation.on_floor_duration,
            },
            &mut self.ids,
        );
        invariants::check_snapshot(&snapshot)?;
        #[cfg(test)]
        if let Some(invariant) = self.fault.take() {
            return Err(invariants::InvariantViolation::new(invariant, "injected fault").into());
        }
        let trace = snapshot.id;
        self.sink.emit(LogRecord::from_artifact(
            LogType::AnalysisSnapshot,
            Component::SnapshotEngine,
            trace,
            &snapshot,
        ));
        self.persist(ArtifactKind::Snapshot, now, None, &snapshot);

        let decision = self.decisions.decide(&snapshot);
        self.sink.emit(LogRecord::from_artifact(
            LogType::Decision,
            Component::DecisionEngine,
            trace,
            &decision,
        ));
        self.persist(ArtifactKind::Decision, now, None, &decision);

        let arbiter = self.arbiter.arbitrate(&snapshot, &decision).await;
        invariants::check_arbiter(decision.action, &arbiter)?;
        self.sink.emit(LogRecord::from_artifact(
            LogType::LlmArbiter,
            Component::LlmArbiter,
            trace,
            &arbiter,
        ));
        if let Some(preview) = &arbiter.preview {
            self.sink.emit(LogRecord::from_artifact(
                LogType::MessagePreview,
                Component::LlmArbiter,
                trace,
                preview,
            ));
        }
        self.persist(ArtifactKind::Arbiter, now, None, &arbiter);

        let policy = self.policy.evaluate(&decision, Some(&arbiter), &snapshot);
        invariants::check_policy(decision.action, &policy)?;
        if policy.is_send() {
            self.stats.messages_authorised += 1;
        }
        self.sink.emit(LogRecord::from_artifact(
            LogType::CommunicationPolicy,
            Component::CommunicationPolicy,
            trace,
            &policy,
        ));
        self.persist(ArtifactKind::Policy, now, None, &policy);

        self.buffer.clear();
        self.last_snapshot = Some(trace);
        self.stats.cycles += 1;

        info!(
            snapshot = %trace,
            %reason,
            world_state = %snapshot.world_state,
            risk = %snapshot.risk_level,
            decision = %decision.action,
            final_decision = %arbiter.final_decision,
            send = policy.is_send(),
            "cycle complete"
        );

        Ok(CycleReport {
            snapshot,
            decision,
            arbiter,
            policy,
        })
    }

    fn persist<T: Serialize>(&self, kind: ArtifactKind, at: Timestamp, tag: Option<&str>, artifact: &T) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(kind, at, tag, artifact) {
                warn!(error = %e, kind = kind.dir(), "artifact not persisted");
            }
        }
    }
}

impl std::fmt::Debug for FallPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallPipeline")
            .field("subject", &self.ids.subject())
            .field("pending_events", &self.buffer.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
