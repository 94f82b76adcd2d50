//! JSON artifact store
//!
//! Artifacts land in `<root>/<YYYY-MM-DD>/<kind>/<secs.millis>_<TAG>.json`,
//! dated by the artifact's own timestamp in UTC.

use std::fs;
use std::path::{Path, PathBuf};

use fallwatch_core::{FallwatchResult, Timestamp};
use serde::Serialize;
use tracing::debug;

/// Store configuration
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: PathBuf::from("data"),
        }
    }
}

/// Artifact category, one directory each
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Event,
    Snapshot,
    Decision,
    Arbiter,
    Policy,
}

impl ArtifactKind {
    pub fn dir(self) -> &'static str {
        match self {
            ArtifactKind::Event => "events",
            ArtifactKind::Snapshot => "snapshots",
            ArtifactKind::Decision => "decisions",
            ArtifactKind::Arbiter => "arbiter",
            ArtifactKind::Policy => "policy",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ArtifactKind::Event => "EVENT",
            ArtifactKind::Snapshot => "SNAPSHOT",
            ArtifactKind::Decision => "DECISION",
            ArtifactKind::Arbiter => "ARBITER",
            ArtifactKind::Policy => "POLICY",
        }
    }
}

/// Writes artifacts as pretty JSON documents
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(config: StoreConfig) -> Self {
        ArtifactStore { root: config.root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one kind on one UTC date
    pub fn dir_for(&self, kind: ArtifactKind, at: Timestamp) -> PathBuf {
        let date = at.to_utc().format("%Y-%m-%d").to_string();
        self.root.join(date).join(kind.dir())
    }

    /// File name, `tag` overrides the kind's default tag (events use their type)
    pub fn file_name(kind: ArtifactKind, at: Timestamp, tag: Option<&str>) -> String {
        let micros = at.as_micros();
        format!(
            "{}.{:03}_{}.json",
            micros.div_euclid(1_000_000),
            micros.rem_euclid(1_000_000) / 1_000,
            tag.unwrap_or(kind.tag())
        )
    }

    pub fn save<T: Serialize>(
        &self,
        kind: ArtifactKind,
        at: Timestamp,
        tag: Option<&str>,
        artifact: &T,
    ) -> FallwatchResult<PathBuf> {
        let dir = self.dir_for(kind, at);
        fs::create_dir_all(&dir)?;
        let path = dir.join(Self::file_name(kind, at, tag));
        let body = serde_json::to_string_pretty(artifact)?;
        fs::write(&path, body)?;
        debug!(path = %path.display(), "artifact saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fallwatch-{}-{:016x}", name, rand::random::<u64>()))
    }

    #[test]
    fn test_file_layout() {
        let store = ArtifactStore::new(StoreConfig {
            root: PathBuf::from("/data"),
        });
        let at = Timestamp::from_millis(1_700_000_000_250);
        assert_eq!(
            store.dir_for(ArtifactKind::Snapshot, at),
            PathBuf::from("/data/2023-11-14/snapshots")
        );
        assert_eq!(
            ArtifactStore::file_name(ArtifactKind::Event, at, Some("POTENTIAL_FALL")),
            "1700000000.250_POTENTIAL_FALL.json"
        );
        assert_eq!(
            ArtifactStore::file_name(ArtifactKind::Policy, at, None),
            "1700000000.250_POLICY.json"
        );
    }

    #[test]
    fn test_save_writes_pretty_json() {
        let root = scratch_dir("store");
        let store = ArtifactStore::new(StoreConfig { root: root.clone() });
        let path = store
            .save(
                ArtifactKind::Decision,
                Timestamp::from_millis(5_000),
                None,
                &serde_json::json!({ "action": "IGNORE" }),
            )
            .unwrap();

        assert!(path.starts_with(root.join("1970-01-01").join("decisions")));
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains("\n"));
        assert!(body.contains("\"IGNORE\""));
        fs::remove_dir_all(root).unwrap();
    }
}
