use async_trait::async_trait;
use serde_json::Value;

use crate::config::{GenerationDefaults, ProviderKind};
use crate::error::LLMError;
use crate::http::{
    HttpBodyStream, HttpClient, HttpStreamResponse, JsonResponse, RequestOptions, RetryPolicy,
};
use crate::provider::{LLMProvider, join_url};
use crate::stream::{FragmentStream, TextStream};
use crate::types::{CapabilityDescriptor, UnifiedRequest, UnifiedResult};

use super::request::build_openai_body;
use super::response::map_response;
use super::stream::OpenAiFraming;

/// OpenAI Chat Completions provider.
///
/// Also serves every OpenAI-compatible vendor (Groq, OpenRouter, DeepSeek, Mistral,
/// Perplexity); only the base URL, credential and name differ.
pub struct OpenAiChatProvider {
    pub(crate) http: HttpClient,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) name: &'static str,
    pub(crate) defaults: GenerationDefaults,
    pub(crate) retry: RetryPolicy,
}

impl OpenAiChatProvider {
    /// Creates a provider pointed at the public OpenAI endpoint.
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: ProviderKind::OpenAi.default_base_url().to_string(),
            api_key: api_key.into(),
            name: ProviderKind::OpenAi.as_str(),
            defaults: GenerationDefaults::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Name reported in logs and errors, e.g. `groq`.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        join_url(&self.base_url, "chat/completions")
    }

    fn request_options(&self, body: Value) -> RequestOptions {
        RequestOptions::post(self.endpoint(), body)
            .with_header("Authorization", format!("Bearer {}", self.api_key))
            .with_retry(self.retry)
    }
}

#[async_trait]
impl LLMProvider for OpenAiChatProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
            supports_structured_output: true,
            hoists_system: false,
        }
    }

    fn normalize(&self, request: &UnifiedRequest) -> Result<Value, LLMError> {
        Ok(build_openai_body(request, &self.defaults))
    }

    fn parse_response(
        &self,
        _request: &UnifiedRequest,
        body: Value,
    ) -> Result<UnifiedResult, LLMError> {
        map_response(body, self.name)
    }

    fn decode_stream(&self, body: HttpBodyStream) -> Result<TextStream, LLMError> {
        Ok(FragmentStream::new(body, OpenAiFraming::new(self.name)).boxed())
    }

    async fn send(&self, _request: &UnifiedRequest, body: Value) -> Result<JsonResponse, LLMError> {
        self.http.request(&self.request_options(body)).await
    }

    async fn send_stream(
        &self,
        _request: &UnifiedRequest,
        body: Value,
    ) -> Result<HttpStreamResponse, LLMError> {
        self.http.request_stream(&self.request_options(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::panic_transport;
    use crate::types::OutputMode;

    fn provider() -> OpenAiChatProvider {
        OpenAiChatProvider::new(HttpClient::new(panic_transport()), "sk-test")
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            provider().endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            provider()
                .with_base_url("https://api.deepseek.com/")
                .endpoint(),
            "https://api.deepseek.com/chat/completions"
        );
    }

    #[test]
    fn request_options_carry_bearer_auth_and_retry() {
        let retry = RetryPolicy::new(2, std::time::Duration::from_millis(5));
        let options = provider()
            .with_retry(retry)
            .request_options(serde_json::json!({}));
        assert_eq!(
            options.headers.get("Authorization").map(String::as_str),
            Some("Bearer sk-test")
        );
        assert_eq!(options.retry, retry);
    }

    #[test]
    fn structured_denormalize_parses_or_wraps_text() {
        let request =
            UnifiedRequest::new("hi", "gpt-4o-mini").with_output_mode(OutputMode::Structured);
        let provider = provider();

        let result = provider
            .denormalize(
                &request,
                serde_json::json!({"choices": [{"message": {"content": "{\"x\":1}"}}]}),
            )
            .unwrap();
        assert_eq!(result.structured, Some(serde_json::json!({"x": 1})));

        let result = provider
            .denormalize(
                &request,
                serde_json::json!({"choices": [{"message": {"content": "not json"}}]}),
            )
            .unwrap();
        assert_eq!(result.structured, Some(serde_json::json!({"raw": "not json"})));
        assert_eq!(result.text, "not json");
    }

    #[tokio::test]
    async fn invalid_request_fails_before_network() {
        let request = UnifiedRequest::new(Vec::<crate::types::Message>::new(), "gpt-4o-mini");
        let err = provider().complete(&request).await.expect_err("empty messages");
        assert!(matches!(err, LLMError::Validation { .. }));
    }
}
