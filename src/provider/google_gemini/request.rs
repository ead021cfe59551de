use serde_json::{Map, Value, json};

use crate::config::GenerationDefaults;
use crate::error::LLMError;
use crate::types::{OutputMode, Role, UnifiedRequest};

/// Builds a `generateContent` body. The model travels in the URL, not the body.
///
/// # Errors
///
/// Returns [`LLMError::UnsupportedFeature`] for [`OutputMode::Streaming`].
pub(crate) fn build_gemini_body(
    request: &UnifiedRequest,
    defaults: &GenerationDefaults,
) -> Result<Value, LLMError> {
    if request.output_mode == OutputMode::Streaming {
        return Err(LLMError::UnsupportedFeature {
            feature: "streaming output for gemini",
        });
    }

    let mut body = Map::new();
    let contents: Vec<Value> = request
        .conversation()
        .map(|message| {
            let role = match message.role {
                Role::Assistant => "model",
                _ => "user",
            };
            json!({ "role": role, "parts": [{ "text": message.content }] })
        })
        .collect();
    body.insert("contents".to_string(), Value::Array(contents));

    if let Some(system) = request.system_instruction() {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": system }] }),
        );
    }

    let mut config = Map::new();
    if let Some(temperature) = request.temperature.or(defaults.temperature) {
        config.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = request.top_p.or(defaults.top_p) {
        config.insert("topP".to_string(), Value::from(top_p));
    }
    if let Some(max_tokens) = request.max_output_tokens.or(defaults.max_output_tokens) {
        config.insert("maxOutputTokens".to_string(), Value::from(max_tokens));
    }
    if let Some(stop) = request.stop.as_ref().and_then(|stop| stop.to_list()) {
        config.insert("stopSequences".to_string(), Value::from(stop));
    }
    if request.output_mode == OutputMode::Structured {
        config.insert(
            "responseMimeType".to_string(),
            Value::String("application/json".to_string()),
        );
    }
    if !config.is_empty() {
        body.insert("generationConfig".to_string(), Value::Object(config));
    }

    Ok(Value::Object(body))
}
