//! Model output grammar
//!
//! Models asked for JSON often wrap it in a Markdown fence. The accepted
//! shape is: optional leading ```` ```json ```` or ```` ``` ````, the JSON
//! document, optional trailing ```` ``` ````. Anything else is malformed.

use serde::de::DeserializeOwned;

use crate::LlmError;

/// Remove one surrounding fenced-code wrapper, if present
pub fn strip_code_fence(raw: &str) -> &str {
    let mut cleaned = raw.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }

    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    cleaned.trim()
}

/// Strip the fence and parse strict JSON into `T`
pub fn parse_json_output<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        tracing::debug!(error = %e, preview = %preview(raw, 200), "Unparseable model output");
        LlmError::MalformedOutput(e.to_string())
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Verdict {
        sufficient: bool,
    }

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"sufficient\": true}\n```";
        assert_eq!(strip_code_fence(raw), "{\"sufficient\": true}");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fence("```\n[1, 2]\n```  "), "[1, 2]");
    }

    #[test]
    fn test_unfenced_passthrough() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_fenced_json() {
        let verdict: Verdict = parse_json_output("```json {\"sufficient\": false} ```").unwrap();
        assert!(!verdict.sufficient);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let result: Result<Verdict, _> = parse_json_output("Sure! The context looks fine.");
        assert!(matches!(result, Err(LlmError::MalformedOutput(_))));
    }
}
