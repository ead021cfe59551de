use serde_json::Value;

use crate::error::LLMError;
use crate::types::{TokenUsage, UnifiedResult};

use super::types::{OpenAiChatResponse, OpenAiMessageContent, OpenAiUsage};

pub(crate) fn map_response(body: Value, provider: &'static str) -> Result<UnifiedResult, LLMError> {
    let resp: OpenAiChatResponse = serde_json::from_value(body).map_err(|err| {
        LLMError::provider(provider, format!("failed to parse chat completion: {err}"))
    })?;
    let first = resp.choices.into_iter().next();
    let finish_reason = first.as_ref().and_then(|choice| choice.finish_reason.clone());
    let text = first
        .and_then(|choice| {
            choice
                .message
                .and_then(|message| message.content)
                .map(content_text)
                .or(choice.text)
        })
        .unwrap_or_default();

    Ok(UnifiedResult {
        text,
        usage: resp.usage.map(convert_usage),
        model: resp.model,
        finish_reason,
        ..UnifiedResult::default()
    })
}

fn content_text(content: OpenAiMessageContent) -> String {
    match content {
        OpenAiMessageContent::Text(text) => text,
        OpenAiMessageContent::Parts(parts) => parts
            .into_iter()
            .filter(|part| part.kind.as_deref().is_none_or(|kind| kind == "text"))
            .filter_map(|part| part.text)
            .collect(),
    }
}

pub(crate) fn convert_usage(usage: OpenAiUsage) -> TokenUsage {
    TokenUsage::from_counts(usage.prompt_tokens, usage.completion_tokens)
}
