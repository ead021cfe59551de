use serde_json::{Value, json};

/// Parses generated text as JSON for structured mode.
///
/// Text that is not valid JSON is wrapped as `{"raw": text}` instead of failing.
///
/// # Examples
///
/// ```
/// use one_llm::provider::structured::parse_structured;
/// use serde_json::json;
///
/// assert_eq!(parse_structured(r#"{"x":1}"#), json!({"x": 1}));
/// assert_eq!(parse_structured("not json"), json!({"raw": "not json"}));
/// ```
pub fn parse_structured(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "structured output is not JSON, wrapping raw text");
            json!({ "raw": text })
        }
    }
}
