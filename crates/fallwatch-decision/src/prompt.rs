//! Arbiter prompt construction and response parsing

use fallwatch_core::{
    ArbiterDebug, FallwatchError, FallwatchResult, Recommendation, RiskLevel, Snapshot,
};
use serde::Deserialize;

const INSTRUCTIONS: &str = r#"You review structured observations from a home safety monitor.

You receive an analysis snapshot built from pose, motion and timing events.
You cannot see any video and you cannot trigger or block any action.
Your assessment is advisory and is recorded for audit.

Base your answer only on the snapshot. Do not assume injury, identity or
camera accuracy unless the snapshot clearly supports it. When the data is
thin, prefer the lower-risk recommendation and say what is uncertain.

Answer with a single JSON object and nothing else, using exactly this schema:

{
  "recommendation": "NOTIFY_CAREGIVER | REQUEST_CONFIRMATION | MONITOR | IGNORE",
  "risk_level": "low | medium | high | critical",
  "confidence": 0.0,
  "reasoning": "one or two sentences grounded in the snapshot",
  "uncertainty_flags": [],
  "notes": ""
}

Analysis snapshot:
"#;

/// Render the arbiter prompt for a snapshot
pub fn build_prompt(snapshot: &Snapshot) -> FallwatchResult<String> {
    let body = serde_json::to_string_pretty(snapshot)?;
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + body.len() + 1);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str(&body);
    prompt.push('\n');
    Ok(prompt)
}

#[derive(Deserialize)]
struct RawAssessment {
    recommendation: String,
    #[serde(default)]
    risk_level: Option<RiskLevel>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    uncertainty_flags: Vec<String>,
    #[serde(default)]
    notes: String,
}

fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse a backend answer. Anything outside the schema or the closed
/// recommendation set is an error.
pub fn parse_response(text: &str) -> FallwatchResult<ArbiterDebug> {
    let body = strip_fences(text);
    if body.is_empty() {
        return Err(FallwatchError::EmptyResponse);
    }
    let raw: RawAssessment = serde_json::from_str(body)
        .map_err(|e| FallwatchError::UnparseableResponse(e.to_string()))?;
    let recommendation: Recommendation = raw.recommendation.parse()?;

    Ok(ArbiterDebug {
        recommendation,
        risk_level: raw.risk_level.unwrap_or(RiskLevel::Medium),
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        reasoning: raw
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "No reasoning provided.".to_string()),
        uncertainty_flags: raw.uncertainty_flags,
        notes: raw.notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_answer() {
        let text = "```json\n{\"recommendation\": \"MONITOR\", \"risk_level\": \"medium\", \"confidence\": 0.8, \"reasoning\": \"calm\", \"uncertainty_flags\": [\"low_light\"]}\n```";
        let debug = parse_response(text).unwrap();
        assert_eq!(debug.recommendation, Recommendation::Monitor);
        assert_eq!(debug.risk_level, RiskLevel::Medium);
        assert_eq!(debug.uncertainty_flags, vec!["low_light".to_string()]);
    }

    #[test]
    fn test_unknown_recommendation_rejected() {
        let text = r#"{"recommendation": "CALL_AMBULANCE", "risk_level": "critical"}"#;
        assert!(matches!(
            parse_response(text),
            Err(FallwatchError::UnparseableResponse(_))
        ));
    }

    #[test]
    fn test_prose_rejected() {
        assert!(parse_response("I think the person is fine.").is_err());
        assert!(matches!(
            parse_response("```\n```"),
            Err(FallwatchError::EmptyResponse)
        ));
    }

    #[test]
    fn test_instructions_carry_no_mock_keywords() {
        let lower = INSTRUCTIONS.to_lowercase();
        assert!(!lower.contains("recovering"));
        assert!(!lower.contains("unconscious"));
        assert!(!lower.contains("major fall"));
    }
}
