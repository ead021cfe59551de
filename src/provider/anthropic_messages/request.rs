use serde_json::{Map, Value, json};

use crate::config::GenerationDefaults;
use crate::types::{OutputMode, UnifiedRequest};

/// Used when neither the request nor the defaults provide `max_tokens`, which the
/// Messages API requires.
pub(crate) const FALLBACK_MAX_TOKENS: u32 = 1024;

/// Builds a Messages body.
///
/// System messages are hoisted into the top-level `system` field; `response_format`
/// has no Messages counterpart and is never sent.
pub(crate) fn build_anthropic_body(
    request: &UnifiedRequest,
    defaults: &GenerationDefaults,
) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert(
        "max_tokens".to_string(),
        Value::from(
            request
                .max_output_tokens
                .or(defaults.max_output_tokens)
                .unwrap_or(FALLBACK_MAX_TOKENS),
        ),
    );
    let messages: Vec<Value> = request
        .conversation()
        .map(|message| json!({ "role": message.role.as_str(), "content": message.content }))
        .collect();
    body.insert("messages".to_string(), Value::Array(messages));
    if let Some(system) = request.system_instruction() {
        body.insert("system".to_string(), Value::String(system.to_string()));
    }
    if let Some(temperature) = request.temperature.or(defaults.temperature) {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = request.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(stop) = request.stop.as_ref().and_then(|stop| stop.to_list()) {
        body.insert("stop_sequences".to_string(), Value::from(stop));
    }
    body.insert(
        "stream".to_string(),
        Value::Bool(request.output_mode == OutputMode::Streaming),
    );
    Value::Object(body)
}
