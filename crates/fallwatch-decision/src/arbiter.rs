//! LLM arbiter
//!
//! A bounded secondary pass over decisions. It never executes or blocks
//! anything. Every fault (timeout, transport, empty or unparseable answer)
//! degrades to the original decision with status `skipped`.

use std::sync::Arc;
use std::time::Duration;

use fallwatch_core::{
    Action, ArbiterDebug, ArbiterMode, ArbiterResult, ArbiterStatus, Decision, FallwatchError,
    FallwatchResult, Locale, PatternTag, Snapshot,
};
use tracing::{debug, info, warn};

use crate::{build_preview, build_prompt, parse_response, MockProvider, OpenAiProvider, ReasoningProvider};

/// Suffix appended to the reasoning of a decision the arbiter failed to evaluate
pub const FALLBACK_SUFFIX: &str = "[arbiter: fallback]";
/// Suffix appended to the reasoning of a decision that was not eligible
pub const SKIPPED_SUFFIX: &str = "[arbiter: skipped]";

/// Arbiter configuration
#[derive(Clone)]
pub struct ArbiterConfig {
    /// Use the HTTP backend; otherwise the mock backend
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub mode: ArbiterMode,
    /// Upper bound on one backend call
    pub timeout: Duration,
    pub locale: Locale,
    /// Floor time after which every decision is observed
    pub forced_observation_after: f64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        ArbiterConfig {
            enabled: false,
            api_key: None,
            model: "gpt-5-mini".to_string(),
            base_url: OpenAiProvider::DEFAULT_BASE_URL.to_string(),
            mode: ArbiterMode::Observe,
            timeout: Duration::from_secs(8),
            locale: Locale::En,
            forced_observation_after: 5.0,
        }
    }
}

impl ArbiterConfig {
    pub fn with_mode(mut self, mode: ArbiterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ArbiterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArbiterConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .field("locale", &self.locale)
            .field("forced_observation_after", &self.forced_observation_after)
            .finish()
    }
}

/// Why a decision reaches the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// `REQUEST_CONFIRMATION`: may be replaced in enforce mode
    Ambiguous,
    /// Recorded only, never replaced
    ForcedObservation,
    NotEligible,
}

/// LLM arbiter
#[derive(Clone)]
pub struct Arbiter {
    provider: Arc<dyn ReasoningProvider>,
    config: ArbiterConfig,
}

impl Arbiter {
    /// Select the backend from configuration. A missing key with the HTTP
    /// backend enabled is a startup error.
    pub fn from_config(config: ArbiterConfig) -> FallwatchResult<Self> {
        let provider: Arc<dyn ReasoningProvider> = if config.enabled {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or(FallwatchError::MissingCredential("OPENAI_API_KEY"))?;
            Arc::new(OpenAiProvider::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.timeout,
            )?)
        } else {
            Arc::new(MockProvider::new())
        };

        info!(
            provider = provider.name(),
            model = provider.model(),
            mode = %config.mode,
            "arbiter initialised"
        );
        Ok(Arbiter { provider, config })
    }

    /// Use an explicit backend
    pub fn with_provider(config: ArbiterConfig, provider: Arc<dyn ReasoningProvider>) -> Self {
        Arbiter { provider, config }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn eligibility(&self, snapshot: &Snapshot, decision: &Decision) -> Eligibility {
        if decision.action == Action::RequestConfirmation {
            Eligibility::Ambiguous
        } else if decision.action == Action::NotifyFamilyInfo
            || snapshot.on_floor_duration_seconds > self.config.forced_observation_after
            || snapshot.has_pattern(PatternTag::ProlongedFloorImmobility)
        {
            Eligibility::ForcedObservation
        } else {
            Eligibility::NotEligible
        }
    }

    pub async fn arbitrate(&self, snapshot: &Snapshot, decision: &Decision) -> ArbiterResult {
        let eligibility = self.eligibility(snapshot, decision);
        if eligibility == Eligibility::NotEligible {
            debug!(snapshot = %snapshot.id, action = %decision.action, "arbiter not eligible");
            return self.skipped(decision, SKIPPED_SUFFIX);
        }

        let assessment = match self.assess(snapshot).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(snapshot = %snapshot.id, error = %e, "arbiter fallback");
                return self.skipped(decision, FALLBACK_SUFFIX);
            }
        };

        let enforce = self.config.mode == ArbiterMode::Enforce && eligibility == Eligibility::Ambiguous;
        let result = if enforce {
            let final_decision = assessment.recommendation.action();
            ArbiterResult {
                snapshot_id: decision.snapshot_id,
                original_decision: decision.action,
                final_decision,
                confidence: assessment.confidence,
                preview: Some(build_preview(final_decision, &assessment.reasoning, self.config.locale)),
                reasoning: assessment.reasoning,
                status: ArbiterStatus::Enforced,
                mode: self.config.mode,
                debug: None,
                model: Some(self.provider.model().to_string()),
            }
        } else {
            ArbiterResult {
                snapshot_id: decision.snapshot_id,
                original_decision: decision.action,
                final_decision: decision.action,
                confidence: decision.confidence,
                reasoning: decision.reasoning.clone(),
                status: ArbiterStatus::Observed,
                mode: self.config.mode,
                preview: Some(build_preview(decision.action, &assessment.reasoning, self.config.locale)),
                debug: Some(assessment),
                model: Some(self.provider.model().to_string()),
            }
        };

        info!(
            snapshot = %snapshot.id,
            status = ?result.status,
            original = %result.original_decision,
            final_decision = %result.final_decision,
            model = self.provider.model(),
            "arbiter evaluated"
        );
        result
    }

    async fn assess(&self, snapshot: &Snapshot) -> FallwatchResult<ArbiterDebug> {
        let prompt = build_prompt(snapshot)?;
        let text = tokio::time::timeout(self.config.timeout, self.provider.generate(&prompt))
            .await
            .map_err(|_| FallwatchError::ProviderTimeout(self.config.timeout))??;
        parse_response(&text)
    }

    fn skipped(&self, decision: &Decision, suffix: &str) -> ArbiterResult {
        let reasoning = if decision.reasoning.is_empty() {
            suffix.to_string()
        } else {
            format!("{} {}", decision.reasoning, suffix)
        };
        ArbiterResult {
            snapshot_id: decision.snapshot_id,
            original_decision: decision.action,
            final_decision: decision.action,
            confidence: decision.confidence,
            reasoning,
            status: ArbiterStatus::Skipped,
            mode: self.config.mode,
            debug: None,
            preview: None,
            model: None,
        }
    }
}

impl std::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbiter")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use fallwatch_core::{
        invariants, DecisionRule, Hypothesis, HypothesisType, MovementTrend, ObservedPosture,
        ObservedState, Posture, RiskLevel, SnapshotId, SubjectId, TimeWindow, Timestamp,
        TriggerReason, WorldState,
    };

    struct Scripted(&'static str);

    #[async_trait]
    impl ReasoningProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn model(&self) -> &str {
            "scripted-1"
        }
        async fn generate(&self, _prompt: &str) -> FallwatchResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl ReasoningProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn model(&self) -> &str {
            "failing-1"
        }
        async fn generate(&self, _prompt: &str) -> FallwatchResult<String> {
            Err(FallwatchError::ProviderStatus(503))
        }
    }

    struct Slow;

    #[async_trait]
    impl ReasoningProvider for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn model(&self) -> &str {
            "slow-1"
        }
        async fn generate(&self, _prompt: &str) -> FallwatchResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    const MONITOR_ANSWER: &str = r#"{"recommendation": "MONITOR", "risk_level": "medium", "confidence": 0.8, "reasoning": "Subject is upright again.", "uncertainty_flags": ["partial_view"], "notes": ""}"#;

    fn snapshot(on_floor: f64) -> Snapshot {
        Snapshot {
            id: SnapshotId::new(SubjectId::new(1), 9),
            generated_at: Timestamp::from_millis(12_000),
            window: TimeWindow::new(Timestamp::from_millis(2_000), Timestamp::from_millis(12_000)),
            world_state: WorldState::PossibleFallConfirmed,
            risk_level: RiskLevel::Critical,
            confidence: 0.9,
            observed_state: ObservedState::new(ObservedPosture::OnFloor, MovementTrend::Still),
            detected_patterns: vec![PatternTag::FallSequenceDetected],
            hypotheses: vec![Hypothesis::new(HypothesisType::Fall, "fall", 0.85)],
            event_counts: BTreeMap::new(),
            supporting_events: Vec::new(),
            on_floor_duration_seconds: on_floor,
            posture: Some(Posture::OnFloor),
            trigger_reason: TriggerReason::CriticalEvent,
            fall_confidence: Some(0.85),
            reasoning_trace: String::new(),
        }
    }

    fn decision(action: Action) -> Decision {
        Decision::new(
            SnapshotId::new(SubjectId::new(1), 9),
            DecisionRule::FallLowPosture,
            action,
            RiskLevel::Medium,
            "Fall detected but time in low posture is short or recent",
        )
    }

    fn arbiter(mode: ArbiterMode, provider: Arc<dyn ReasoningProvider>) -> Arbiter {
        Arbiter::with_provider(
            ArbiterConfig::default()
                .with_mode(mode)
                .with_timeout(Duration::from_millis(200)),
            provider,
        )
    }

    #[test]
    fn test_enabled_without_key_is_fatal() {
        let config = ArbiterConfig {
            enabled: true,
            ..ArbiterConfig::default()
        };
        assert!(matches!(
            Arbiter::from_config(config),
            Err(FallwatchError::MissingCredential("OPENAI_API_KEY"))
        ));
    }

    #[test]
    fn test_disabled_selects_mock() {
        let arbiter = Arbiter::from_config(ArbiterConfig::default()).unwrap();
        assert_eq!(arbiter.provider_name(), "mock");
    }

    #[tokio::test]
    async fn test_not_eligible_is_skipped_without_call() {
        let arbiter = arbiter(ArbiterMode::Enforce, Arc::new(Failing));
        let d = decision(Action::Monitor);
        let result = arbiter.arbitrate(&snapshot(1.0), &d).await;
        assert_eq!(result.status, ArbiterStatus::Skipped);
        assert_eq!(result.final_decision, Action::Monitor);
        assert!(result.reasoning.ends_with(SKIPPED_SUFFIX));
    }

    #[tokio::test]
    async fn test_observe_keeps_original() {
        let arbiter = arbiter(ArbiterMode::Observe, Arc::new(Scripted(MONITOR_ANSWER)));
        let d = decision(Action::RequestConfirmation);
        let result = arbiter.arbitrate(&snapshot(2.0), &d).await;

        assert_eq!(result.status, ArbiterStatus::Observed);
        assert_eq!(result.final_decision, Action::RequestConfirmation);
        let debug = result.debug.as_ref().unwrap();
        assert_eq!(debug.recommendation.action(), Action::Monitor);
        assert_eq!(result.uncertainty_flags(), ["partial_view".to_string()]);
        let preview = result.preview.unwrap();
        assert!(preview.requires_ack);
        assert_eq!(preview.body, "Subject is upright again.");
    }

    #[tokio::test]
    async fn test_enforce_replaces_ambiguous_decision() {
        let arbiter = arbiter(ArbiterMode::Enforce, Arc::new(Scripted(MONITOR_ANSWER)));
        let d = decision(Action::RequestConfirmation);
        let result = arbiter.arbitrate(&snapshot(2.0), &d).await;

        assert_eq!(result.status, ArbiterStatus::Enforced);
        assert_eq!(result.final_decision, Action::Monitor);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.model.as_deref(), Some("scripted-1"));
        assert!(!result.preview.unwrap().requires_ack);
    }

    #[tokio::test]
    async fn test_enforce_only_observes_forced_cases() {
        let arbiter = arbiter(ArbiterMode::Enforce, Arc::new(Scripted(MONITOR_ANSWER)));
        let d = decision(Action::NotifyCaregiver);
        let result = arbiter.arbitrate(&snapshot(12.0), &d).await;

        assert_eq!(result.status, ArbiterStatus::Observed);
        assert_eq!(result.final_decision, Action::NotifyCaregiver);
    }

    #[tokio::test]
    async fn test_family_info_is_always_observed() {
        let arbiter = arbiter(ArbiterMode::Observe, Arc::new(MockProvider::new()));
        let d = decision(Action::NotifyFamilyInfo);
        assert_eq!(
            arbiter.eligibility(&snapshot(0.0), &d),
            Eligibility::ForcedObservation
        );
        let result = arbiter.arbitrate(&snapshot(0.0), &d).await;
        assert_eq!(result.status, ArbiterStatus::Observed);
        assert_eq!(result.final_decision, Action::NotifyFamilyInfo);
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_original() {
        let d = decision(Action::RequestConfirmation);
        let providers: Vec<Arc<dyn ReasoningProvider>> = vec![
            Arc::new(Failing),
            Arc::new(Slow),
            Arc::new(Scripted("")),
            Arc::new(Scripted("not json")),
            Arc::new(Scripted(r#"{"recommendation": "PANIC"}"#)),
        ];
        for provider in providers {
            let arbiter = arbiter(ArbiterMode::Enforce, provider);
            let result = arbiter.arbitrate(&snapshot(2.0), &d).await;
            assert_eq!(result.status, ArbiterStatus::Skipped);
            assert_eq!(result.final_decision, d.action);
            assert!(result.reasoning.ends_with(FALLBACK_SUFFIX));
            assert!(result.preview.is_none());
            invariants::check_arbiter(d.action, &result).unwrap();
        }
    }
}
