use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::mode::Mode;

/// Locate the JSON object inside a raw completion.
///
/// Models wrap JSON in code fences or add a sentence around it often enough
/// that the outermost `{ ... }` span is taken as the payload.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse a stage completion into its typed output shape.
pub fn parse_stage_output<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let body = extract_json_object(raw)
        .ok_or_else(|| format!("no JSON object in stage output: {}", preview(raw)))?;
    serde_json::from_str(body).map_err(|e| format!("invalid stage output: {e}"))
}

/// Deserialize a verdict string, rejecting anything but the two stage verdicts.
pub fn verdict<'de, D>(deserializer: D) -> Result<Mode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Mode::parse_verdict(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown mode `{raw}`")))
}

fn preview(raw: &str) -> String {
    const MAX: usize = 120;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Output {
        #[serde(deserialize_with = "verdict")]
        mode: Mode,
        #[serde(default)]
        facts: Vec<String>,
    }

    #[test]
    fn extracts_object_from_code_fence() {
        let raw = "```json\n{\"mode\": \"NEED_OPERATOR\"}\n```";
        assert_eq!(extract_json_object(raw), Some("{\"mode\": \"NEED_OPERATOR\"}"));
    }

    #[test]
    fn extract_returns_none_without_braces() {
        assert_eq!(extract_json_object("I cannot help with that."), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn parses_object_surrounded_by_prose() {
        let raw = "Sure! Here it is: {\"facts\": [\"a: b\"], \"mode\": \"SELF_CONFIDENCE\"} Hope it helps.";
        let output: Output = parse_stage_output(raw).unwrap();
        assert_eq!(output.mode, Mode::SelfConfidence);
        assert_eq!(output.facts, vec!["a: b".to_string()]);
    }

    #[test]
    fn unknown_mode_is_a_parse_failure() {
        let err = parse_stage_output::<Output>("{\"mode\": \"CASES_USED\"}").unwrap_err();
        assert!(err.contains("unknown mode"), "{err}");
    }

    #[test]
    fn missing_mode_is_a_parse_failure() {
        assert!(parse_stage_output::<Output>("{\"facts\": []}").is_err());
    }

    #[test]
    fn long_garbage_is_truncated_in_error() {
        let raw = "x".repeat(500);
        let err = parse_stage_output::<Output>(&raw).unwrap_err();
        assert!(err.len() < 200);
    }
}
