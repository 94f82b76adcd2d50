//! Event definitions
//!
//! Events are immutable facts. Atomic events are direct observations of the
//! motion signal; composite events are hypotheses derived from atomic events
//! and floor duration, linked to their triggers by an event chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{EventId, FallwatchError, Timestamp};

/// Event type tag (closed set)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RapidVerticalMovement,
    PotentialFall,
    ConfirmedFallByDuration,
}

impl EventType {
    pub fn all() -> &'static [EventType] {
        &[
            EventType::RapidVerticalMovement,
            EventType::PotentialFall,
            EventType::ConfirmedFallByDuration,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::RapidVerticalMovement => "RAPID_VERTICAL_MOVEMENT",
            EventType::PotentialFall => "POTENTIAL_FALL",
            EventType::ConfirmedFallByDuration => "CONFIRMED_FALL_BY_DURATION",
        }
    }

    pub fn category(self) -> EventCategory {
        match self {
            EventType::RapidVerticalMovement => EventCategory::Motion,
            EventType::PotentialFall | EventType::ConfirmedFallByDuration => {
                EventCategory::Composite
            }
        }
    }

    #[inline]
    pub fn is_composite(self) -> bool {
        self.category() == EventCategory::Composite
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = FallwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FallwatchError::UnknownEventType(s.to_string()))
    }
}

/// Event category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Motion,
    Posture,
    Composite,
}

/// Severity hint carried by an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Typed signal payload, one schema per event type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Vertical displacement of the hip centre between two frames
    RapidVerticalMovement {
        dy: f64,
        dt: f64,
        velocity: f64,
        threshold: f64,
    },
    /// Motion-only early warning
    PotentialFall { trigger_dy: f64, time_window: f64 },
    /// Floor episode reached the confirmation threshold
    ConfirmedFallByDuration { on_floor_duration: f64 },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::RapidVerticalMovement { .. } => EventType::RapidVerticalMovement,
            EventKind::PotentialFall { .. } => EventType::PotentialFall,
            EventKind::ConfirmedFallByDuration { .. } => EventType::ConfirmedFallByDuration,
        }
    }
}

/// Event - an immutable, time-stamped fact
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub category: EventCategory,
    pub timestamp: Timestamp,
    /// Triggering events, oldest first; empty for atomic events
    pub event_chain: Vec<EventId>,
    pub confidence_hint: f64,
    pub severity_hint: Severity,
}

impl Event {
    /// Create a new event with an empty chain and full confidence
    pub fn new(id: EventId, kind: EventKind, timestamp: Timestamp) -> Self {
        let category = kind.event_type().category();
        Event {
            id,
            kind,
            category,
            timestamp,
            event_chain: Vec::new(),
            confidence_hint: 1.0,
            severity_hint: Severity::Low,
        }
    }

    /// Set the triggering event chain
    pub fn with_chain(mut self, chain: Vec<EventId>) -> Self {
        self.event_chain = chain;
        self
    }

    /// Set the confidence hint (clamped to [0, 1])
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_hint = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the severity hint
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity_hint = severity;
        self
    }

    #[inline]
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        self.category == EventCategory::Composite
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            event_type: self.event_type(),
            timestamp: self.timestamp,
        }
    }
}

/// Id/type/time triple kept in snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: Timestamp,
}

/// Validate the type tag of a raw JSON event before decoding it
pub fn event_from_json(value: serde_json::Value) -> Result<Event, FallwatchError> {
    let tag = value
        .get("kind")
        .and_then(|kind| kind.get("type"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| FallwatchError::UnknownEventType("<missing>".to_string()))?;
    tag.parse::<EventType>()?;
    Ok(serde_json::from_value(value)?)
}
