use serde_json::Value;

use crate::error::LLMError;
use crate::types::{TokenUsage, UnifiedRequest, UnifiedResult};

use super::types::GeminiResponse;

/// Maps a `generateContent` response. The model falls back to the requested one when
/// the response carries no `modelVersion`.
pub(crate) fn map_response(
    request: &UnifiedRequest,
    body: Value,
    provider: &'static str,
) -> Result<UnifiedResult, LLMError> {
    let resp: GeminiResponse = serde_json::from_value(body).map_err(|err| {
        LLMError::provider(provider, format!("failed to parse generateContent response: {err}"))
    })?;
    let first = resp.candidates.into_iter().next();
    let finish_reason = first.as_ref().and_then(|candidate| candidate.finish_reason.clone());
    let text = first
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .unwrap_or_default();

    Ok(UnifiedResult {
        text,
        usage: resp.usage_metadata.map(|usage| {
            TokenUsage::from_counts(usage.prompt_token_count, usage.candidates_token_count)
        }),
        model: resp.model_version.or_else(|| Some(request.model.clone())),
        finish_reason,
        ..UnifiedResult::default()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_first_part_and_usage() {
        let request = UnifiedRequest::new("hi", "gemini-1.5-flash");
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello! I am Gemini."}, {"text": "more"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 5, "totalTokenCount": 100}
        });

        let result = map_response(&request, body, "gemini").unwrap();
        assert_eq!(result.text, "Hello! I am Gemini.");
        assert_eq!(result.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(result.model.as_deref(), Some("gemini-1.5-flash"));
        assert_eq!(result.usage.map(|usage| usage.total_tokens), Some(13));
    }

    #[test]
    fn prefers_reported_model_version_and_handles_empty_candidates() {
        let request = UnifiedRequest::new("hi", "gemini-1.5-flash");
        let body = json!({
            "candidates": [],
            "usageMetadata": {"promptTokenCount": 2},
            "modelVersion": "gemini-1.5-flash-002"
        });

        let result = map_response(&request, body, "gemini").unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.model.as_deref(), Some("gemini-1.5-flash-002"));
        assert_eq!(
            result.usage,
            Some(TokenUsage {
                prompt_tokens: 2,
                completion_tokens: 0,
                total_tokens: 2
            })
        );
    }
}
