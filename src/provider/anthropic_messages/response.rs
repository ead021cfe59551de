use serde_json::Value;

use crate::error::LLMError;
use crate::types::{TokenUsage, UnifiedResult};

use super::types::AnthropicMessageResponse;

pub(crate) fn map_response(body: Value, provider: &'static str) -> Result<UnifiedResult, LLMError> {
    let resp: AnthropicMessageResponse = serde_json::from_value(body).map_err(|err| {
        LLMError::provider(provider, format!("failed to parse message response: {err}"))
    })?;
    let text = resp
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .unwrap_or_default();

    Ok(UnifiedResult {
        text,
        usage: resp
            .usage
            .map(|usage| TokenUsage::from_counts(usage.input_tokens, usage.output_tokens)),
        model: resp.model,
        finish_reason: resp.stop_reason,
        ..UnifiedResult::default()
    })
}
