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

use super::request::build_anthropic_body;
use super::response::map_response;
use super::stream::AnthropicFraming;

const DEFAULT_VERSION: &str = "2023-06-01";

/// Anthropic Messages provider.
pub struct AnthropicMessagesProvider {
    pub(crate) http: HttpClient,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) version: String,
    pub(crate) defaults: GenerationDefaults,
    pub(crate) retry: RetryPolicy,
}

impl AnthropicMessagesProvider {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: ProviderKind::Anthropic.default_base_url().to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
            defaults: GenerationDefaults::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Custom base URL, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Value sent as `anthropic-version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
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
        join_url(&self.base_url, "messages")
    }

    fn request_options(&self, body: Value) -> RequestOptions {
        RequestOptions::post(self.endpoint(), body)
            .with_header("x-api-key", self.api_key.clone())
            .with_header("anthropic-version", self.version.clone())
            .with_retry(self.retry)
    }
}

#[async_trait]
impl LLMProvider for AnthropicMessagesProvider {
    fn name(&self) -> &'static str {
        ProviderKind::Anthropic.as_str()
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
            supports_structured_output: false,
            hoists_system: true,
        }
    }

    fn normalize(&self, request: &UnifiedRequest) -> Result<Value, LLMError> {
        Ok(build_anthropic_body(request, &self.defaults))
    }

    fn parse_response(
        &self,
        _request: &UnifiedRequest,
        body: Value,
    ) -> Result<UnifiedResult, LLMError> {
        map_response(body, self.name())
    }

    fn decode_stream(&self, body: HttpBodyStream) -> Result<TextStream, LLMError> {
        Ok(FragmentStream::new(body, AnthropicFraming).boxed())
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

    #[test]
    fn headers_carry_key_and_version() {
        let provider = AnthropicMessagesProvider::new(HttpClient::new(panic_transport()), "ak")
            .with_version("2024-01-01")
            .with_base_url("http://127.0.0.1:8080/v1/");
        let options = provider.request_options(serde_json::json!({}));

        assert_eq!(options.url, "http://127.0.0.1:8080/v1/messages");
        assert_eq!(options.headers.get("x-api-key").map(String::as_str), Some("ak"));
        assert_eq!(
            options.headers.get("anthropic-version").map(String::as_str),
            Some("2024-01-01")
        );
        assert!(!options.headers.contains_key("Authorization"));
    }
}
