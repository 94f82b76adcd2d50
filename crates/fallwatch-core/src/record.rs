//! Structured audit records
//!
//! Every artifact of a cycle is emitted as a [`LogRecord`] with a fixed set of
//! fields. Sinks decide where records go; the pipeline only sees the trait.

use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Record type tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    AtomicEvent,
    CompositeEvent,
    AnalysisSnapshot,
    SnapshotSkipped,
    Decision,
    LlmArbiter,
    MessagePreview,
    CommunicationPolicy,
    SimulationStart,
    SimulationEvent,
    SimulationEnd,
}

impl LogType {
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::AtomicEvent => "ATOMIC_EVENT",
            LogType::CompositeEvent => "COMPOSITE_EVENT",
            LogType::AnalysisSnapshot => "ANALYSIS_SNAPSHOT",
            LogType::SnapshotSkipped => "SNAPSHOT_SKIPPED",
            LogType::Decision => "DECISION",
            LogType::LlmArbiter => "LLM_ARBITER",
            LogType::MessagePreview => "MESSAGE_PREVIEW",
            LogType::CommunicationPolicy => "COMMUNICATION_POLICY",
            LogType::SimulationStart => "SIMULATION_START",
            LogType::SimulationEvent => "SIMULATION_EVENT",
            LogType::SimulationEnd => "SIMULATION_END",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitting component
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    EventDetector,
    EventCorrelator,
    SnapshotEngine,
    SnapshotTrigger,
    DecisionEngine,
    LlmArbiter,
    CommunicationPolicy,
    Simulator,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Component::EventDetector => "event_detector",
            Component::EventCorrelator => "event_correlator",
            Component::SnapshotEngine => "snapshot_engine",
            Component::SnapshotTrigger => "snapshot_trigger",
            Component::DecisionEngine => "decision_engine",
            Component::LlmArbiter => "llm_arbiter",
            Component::CommunicationPolicy => "communication_policy",
            Component::Simulator => "simulator",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured audit record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub log_type: LogType,
    /// ISO-8601 UTC wall-clock time of emission
    pub timestamp: String,
    pub component: Component,
    pub trace_id: String,
    pub payload: serde_json::Value,
}

impl LogRecord {
    /// Build a record stamped with the current UTC time
    pub fn new(
        log_type: LogType,
        component: Component,
        trace_id: impl ToString,
        payload: serde_json::Value,
    ) -> Self {
        LogRecord {
            log_type,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            component,
            trace_id: trace_id.to_string(),
            payload,
        }
    }

    /// Build a record from any serializable artifact
    pub fn from_artifact<T: Serialize>(
        log_type: LogType,
        component: Component,
        trace_id: impl ToString,
        artifact: &T,
    ) -> Self {
        let payload = serde_json::to_value(artifact).unwrap_or_else(|e| {
            serde_json::json!({ "serialization_error": e.to_string() })
        });
        LogRecord::new(log_type, component, trace_id, payload)
    }
}

/// Destination for audit records
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

impl<S: RecordSink + ?Sized> RecordSink for Arc<S> {
    fn emit(&self, record: LogRecord) {
        (**self).emit(record)
    }
}

/// Discards every record
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn emit(&self, _record: LogRecord) {}
}

/// Keeps records in memory, mostly for tests and simulation reports
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn of_type(&self, log_type: LogType) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.log_type == log_type)
            .cloned()
            .collect()
    }

    pub fn count(&self, log_type: LogType) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.log_type == log_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields() {
        let record = LogRecord::new(
            LogType::Decision,
            Component::DecisionEngine,
            "0000000000000001-4",
            serde_json::json!({ "action": "IGNORE" }),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["log_type"], "DECISION");
        assert_eq!(json["component"], "decision_engine");
        assert_eq!(json["trace_id"], "0000000000000001-4");
        assert!(record.timestamp.ends_with('Z'));
    }
}
