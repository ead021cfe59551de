use serde_json::{Map, Value, json};

use crate::config::GenerationDefaults;
use crate::types::{Message, OutputMode, Role, StopSequences, UnifiedRequest};

/// Builds a Chat Completions body.
///
/// Messages pass through unchanged, including system messages. An explicit system
/// instruction is prepended only when the list carries no system message.
pub(crate) fn build_openai_body(request: &UnifiedRequest, defaults: &GenerationDefaults) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert(
        "messages".to_string(),
        Value::Array(convert_messages(&request.messages, request.system.as_deref())),
    );
    if let Some(max_tokens) = request.max_output_tokens.or(defaults.max_output_tokens) {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(temperature) = request.temperature.or(defaults.temperature) {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = request.top_p.or(defaults.top_p) {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(stop) = &request.stop {
        body.insert("stop".to_string(), convert_stop(stop));
    }
    if request.output_mode == OutputMode::Structured {
        body.insert(
            "response_format".to_string(),
            json!({ "type": "json_object" }),
        );
    }
    body.insert(
        "stream".to_string(),
        Value::Bool(request.output_mode == OutputMode::Streaming),
    );
    Value::Object(body)
}

fn convert_messages(messages: &[Message], system: Option<&str>) -> Vec<Value> {
    let mut converted: Vec<Value> = Vec::with_capacity(messages.len() + 1);
    let has_system = messages.iter().any(|message| message.role == Role::System);
    if let (Some(explicit), false) = (system, has_system) {
        converted.push(json!({ "role": "system", "content": explicit }));
    }
    converted.extend(
        messages
            .iter()
            .map(|message| json!({ "role": message.role.as_str(), "content": message.content })),
    );
    converted
}

fn convert_stop(stop: &StopSequences) -> Value {
    match stop {
        StopSequences::One(value) => Value::String(value.clone()),
        StopSequences::Many(values) => Value::from(values.clone()),
    }
}
