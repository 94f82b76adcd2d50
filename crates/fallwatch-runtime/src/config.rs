//! Monitor configuration
//!
//! Defaults hold the documented thresholds. [`MonitorConfig::from_env`]
//! overlays `FALLWATCH_*` and `LLM_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fallwatch_analysis::SnapshotConfig;
use fallwatch_core::{FallwatchError, FallwatchResult, SubjectId};
use fallwatch_decision::{ArbiterConfig, DecisionConfig, PolicyConfig};
use fallwatch_detect::{CorrelatorConfig, DetectorConfig, FloorConfig};

use crate::{LogFormat, StoreConfig, TriggerConfig};

/// Everything needed to build a pipeline and its driver
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Fixed subject id; random when unset
    pub subject: Option<SubjectId>,
    pub floor: FloorConfig,
    pub detector: DetectorConfig,
    pub correlator: CorrelatorConfig,
    pub trigger: TriggerConfig,
    pub snapshot: SnapshotConfig,
    pub decision: DecisionConfig,
    pub arbiter: ArbiterConfig,
    pub policy: PolicyConfig,
    /// Artifact persistence; disabled when unset
    pub store: Option<StoreConfig>,
    pub ingest_capacity: usize,
    pub log_format: LogFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            subject: None,
            floor: FloorConfig::default(),
            detector: DetectorConfig::default(),
            correlator: CorrelatorConfig::default(),
            trigger: TriggerConfig::default(),
            snapshot: SnapshotConfig::default(),
            decision: DecisionConfig::default(),
            arbiter: ArbiterConfig::default(),
            policy: PolicyConfig::default(),
            store: None,
            ingest_capacity: 1,
            log_format: LogFormat::default(),
        }
    }
}

impl MonitorConfig {
    /// Deterministic configuration for replay and tests
    pub fn simulation(subject: SubjectId) -> Self {
        MonitorConfig {
            subject: Some(subject),
            ..Default::default()
        }
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = Some(store);
        self
    }

    /// Heartbeat interval, shared by the trigger and the empty-window fallback
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.trigger.interval = interval;
        self.snapshot.interval = interval;
        self
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> FallwatchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> FallwatchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = MonitorConfig::default();

        if let Some(v) = get("FALLWATCH_SUBJECT_ID") {
            let id = u64::from_str_radix(v.trim(), 16)
                .map_err(|e| FallwatchError::invalid_config("FALLWATCH_SUBJECT_ID", e.to_string()))?;
            config.subject = Some(SubjectId::new(id));
        }
        if let Some(v) = get("FALLWATCH_DISPLACEMENT_THRESHOLD") {
            config.detector.displacement_threshold =
                positive_f64("FALLWATCH_DISPLACEMENT_THRESHOLD", &v)?;
        }
        if let Some(v) = get("FALLWATCH_MAX_INTERVAL") {
            config.detector.max_interval = duration("FALLWATCH_MAX_INTERVAL", &v)?;
        }
        if let Some(v) = get("FALLWATCH_COOLDOWN") {
            config.detector.cooldown = duration("FALLWATCH_COOLDOWN", &v)?;
        }
        if let Some(v) = get("FALLWATCH_FLOOR_LINE") {
            let line = positive_f64("FALLWATCH_FLOOR_LINE", &v)?;
            if line >= 1.0 {
                return Err(FallwatchError::invalid_config(
                    "FALLWATCH_FLOOR_LINE",
                    "must be a normalised coordinate below 1.0",
                ));
            }
            config.floor.floor_line = line;
        }
        if let Some(v) = get("FALLWATCH_CONFIRM_AFTER") {
            config.correlator.confirm_after = duration("FALLWATCH_CONFIRM_AFTER", &v)?;
        }
        if let Some(v) = get("FALLWATCH_SNAPSHOT_INTERVAL") {
            config = config.with_snapshot_interval(duration("FALLWATCH_SNAPSHOT_INTERVAL", &v)?);
        }
        if let Some(v) = get("FALLWATCH_INGEST_CAPACITY") {
            config.ingest_capacity = parse::<usize>("FALLWATCH_INGEST_CAPACITY", &v)?.max(1);
        }
        if let Some(v) = get("FALLWATCH_ARTIFACT_DIR") {
            config.store = Some(StoreConfig {
                root: PathBuf::from(v.trim()),
            });
        }
        if let Some(v) = get("FALLWATCH_LOG_FORMAT") {
            config.log_format = v.parse()?;
        }
        if let Some(v) = get("FALLWATCH_CHANNEL") {
            config.policy.channel = v.trim().to_string();
        }
        if let Some(v) = get("FALLWATCH_LOCALE") {
            config.arbiter.locale = v.parse()?;
        }

        if let Some(v) = get("LLM_ENABLED") {
            config.arbiter.enabled = flag("LLM_ENABLED", &v)?;
        }
        config.arbiter.api_key = get("OPENAI_API_KEY");
        if let Some(v) = get("LLM_MODEL") {
            config.arbiter.model = v.trim().to_string();
        }
        if let Some(v) = get("LLM_MODE") {
            config.arbiter.mode = v.parse()?;
        }
        if let Some(v) = get("LLM_TIMEOUT") {
            config.arbiter.timeout = duration("LLM_TIMEOUT", &v)?;
        }
        if let Some(v) = get("LLM_BASE_URL") {
            config.arbiter.base_url = v.trim().to_string();
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: &str) -> FallwatchResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| FallwatchError::invalid_config(key, e.to_string()))
}

fn positive_f64(key: &'static str, value: &str) -> FallwatchResult<f64> {
    let v: f64 = parse(key, value)?;
    if !(v.is_finite() && v > 0.0) {
        return Err(FallwatchError::invalid_config(key, "must be a positive number"));
    }
    Ok(v)
}

fn duration(key: &'static str, value: &str) -> FallwatchResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| FallwatchError::invalid_config(key, e.to_string()))
}

fn flag(key: &'static str, value: &str) -> FallwatchResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(FallwatchError::invalid_config(
            key,
            format!("expected a boolean, got {:?}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use fallwatch_core::{ArbiterMode, Locale};
    use serial_test::serial;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.detector.displacement_threshold, 0.18);
        assert_eq!(config.trigger.interval, Duration::from_secs(10));
        assert_eq!(config.correlator.confirm_after, Duration::from_secs(25));
        assert_eq!(config.ingest_capacity, 1);
        assert!(!config.arbiter.enabled);
        assert!(config.store.is_none());
    }

    #[test]
    fn test_lookup_overlay() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("FALLWATCH_DISPLACEMENT_THRESHOLD", "0.2"),
            ("FALLWATCH_SNAPSHOT_INTERVAL", "5s"),
            ("FALLWATCH_CONFIRM_AFTER", "30s"),
            ("FALLWATCH_SUBJECT_ID", "00000000000000ff"),
            ("LLM_MODE", "enforce"),
            ("LLM_TIMEOUT", "1500ms"),
            ("FALLWATCH_LOCALE", "pt-BR"),
        ]))
        .unwrap();

        assert_eq!(config.detector.displacement_threshold, 0.2);
        assert_eq!(config.trigger.interval, Duration::from_secs(5));
        assert_eq!(config.snapshot.interval, Duration::from_secs(5));
        assert_eq!(config.correlator.confirm_after, Duration::from_secs(30));
        assert_eq!(config.subject, Some(SubjectId::new(255)));
        assert_eq!(config.arbiter.mode, ArbiterMode::Enforce);
        assert_eq!(config.arbiter.timeout, Duration::from_millis(1500));
        assert_eq!(config.arbiter.locale, Locale::PtBr);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for (key, value) in [
            ("FALLWATCH_DISPLACEMENT_THRESHOLD", "-1"),
            ("FALLWATCH_FLOOR_LINE", "1.5"),
            ("LLM_TIMEOUT", "soon"),
            ("LLM_ENABLED", "maybe"),
            ("LLM_MODE", "shadow"),
        ] {
            let err = MonitorConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(
                matches!(err, FallwatchError::InvalidConfig { .. }),
                "{} accepted {:?}",
                key,
                value
            );
        }
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("LLM_ENABLED", "true");
        std::env::set_var("OPENAI_API_KEY", "sk-env");
        std::env::set_var("LLM_MODEL", "gpt-test");
        let config = MonitorConfig::from_env();
        std::env::remove_var("LLM_ENABLED");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("LLM_MODEL");

        let config = config.unwrap();
        assert!(config.arbiter.enabled);
        assert_eq!(config.arbiter.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.arbiter.model, "gpt-test");
    }

    #[test]
    #[serial]
    fn test_blank_env_values_are_ignored() {
        std::env::set_var("FALLWATCH_ARTIFACT_DIR", "  ");
        let config = MonitorConfig::from_env();
        std::env::remove_var("FALLWATCH_ARTIFACT_DIR");
        assert!(config.unwrap().store.is_none());
    }
}
