//! Event replay from persisted artifacts

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use fallwatch_analysis::{SnapshotEngine, SnapshotRequest};
use fallwatch_core::{
    event_from_json, Event, EventKind, EventType, FallwatchResult, IdSequence, Snapshot, Timestamp,
    TriggerReason,
};
use tracing::{debug, warn};

use crate::ArtifactKind;

/// Load persisted events, optionally restricted to one UTC date and one
/// event type, sorted by timestamp. Unknown type tags are rejected.
pub fn load_events(
    root: &Path,
    date: Option<NaiveDate>,
    event_type: Option<EventType>,
) -> FallwatchResult<Vec<Event>> {
    let dates: Vec<_> = match date {
        Some(date) => vec![root.join(date.format("%Y-%m-%d").to_string())],
        None => {
            if !root.is_dir() {
                return Ok(Vec::new());
            }
            let mut dirs = Vec::new();
            for entry in fs::read_dir(root)? {
                let path = entry?.path();
                if path.is_dir() {
                    dirs.push(path);
                }
            }
            dirs.sort();
            dirs
        }
    };

    let mut events = Vec::new();
    for day in dates {
        let dir = day.join(ArtifactKind::Event.dir());
        if !dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let body = fs::read_to_string(&path)?;
            let event = event_from_json(serde_json::from_str(&body)?)?;
            if event_type.map_or(true, |t| t == event.event_type()) {
                events.push(event);
            }
        }
    }

    events.sort_by_key(|e| (e.timestamp, e.id));
    debug!(count = events.len(), root = %root.display(), "events loaded");
    Ok(events)
}

/// Run loaded events through the snapshot engine as one timer window
pub fn replay_snapshot(engine: &SnapshotEngine, events: &[Event], ids: &mut IdSequence) -> Snapshot {
    let now = events.last().map(|e| e.timestamp).unwrap_or_else(Timestamp::now);
    let on_floor_duration = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::ConfirmedFallByDuration { on_floor_duration } => Some(on_floor_duration),
            _ => None,
        })
        .fold(0.0, f64::max);
    if events.is_empty() {
        warn!("replaying an empty event set");
    }

    engine.build(
        SnapshotRequest {
            events,
            now,
            trigger: TriggerReason::Timer,
            posture: None,
            on_floor_duration,
        },
        ids,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use fallwatch_core::{FallwatchError, RiskLevel, SubjectId, WorldState};

    use crate::{ArtifactStore, StoreConfig};

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("fallwatch-replay-{:016x}", rand::random::<u64>()))
    }

    fn confirmed(ids: &mut IdSequence, at: Timestamp) -> Event {
        Event::new(
            ids.next_event(),
            EventKind::ConfirmedFallByDuration {
                on_floor_duration: 25.0,
            },
            at,
        )
        .with_confidence(0.95)
    }

    fn rapid(ids: &mut IdSequence, at: Timestamp) -> Event {
        Event::new(
            ids.next_event(),
            EventKind::RapidVerticalMovement {
                dy: 0.2,
                dt: 0.1,
                velocity: 2.0,
                threshold: 0.18,
            },
            at,
        )
    }

    #[test]
    fn test_round_trip_through_store() {
        let root = scratch_dir();
        let store = ArtifactStore::new(StoreConfig { root: root.clone() });
        let mut ids = IdSequence::new(SubjectId::new(2));

        let later = confirmed(&mut ids, Timestamp::from_millis(30_000));
        let earlier = rapid(&mut ids, Timestamp::from_millis(4_000));
        for event in [&later, &earlier] {
            store
                .save(ArtifactKind::Event, event.timestamp, Some(event.event_type().as_str()), event)
                .unwrap();
        }

        let all = load_events(&root, None, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, earlier.id);

        let only = load_events(&root, None, Some(EventType::ConfirmedFallByDuration)).unwrap();
        assert_eq!(only.len(), 1);

        let other_day = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        assert!(load_events(&root, Some(other_day), None).unwrap().is_empty());

        let snapshot = replay_snapshot(&SnapshotEngine::default(), &all, &mut ids);
        assert_eq!(snapshot.world_state, WorldState::FallConfirmed);
        assert_eq!(snapshot.risk_level, RiskLevel::Critical);
        assert_eq!(snapshot.trigger_reason, TriggerReason::Timer);
        assert_eq!(snapshot.on_floor_duration_seconds, 25.0);

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let root = scratch_dir();
        let dir = root.join("1970-01-01").join("events");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("1.000_FALL.json"),
            r#"{"id": "0000000000000001-1", "kind": {"type": "FALL_DETECTED"}}"#,
        )
        .unwrap();

        let err = load_events(&root, None, None).unwrap_err();
        assert!(matches!(err, FallwatchError::UnknownEventType(_)));
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        assert!(load_events(Path::new("/nonexistent/fallwatch"), None, None)
            .unwrap()
            .is_empty());
    }
}
