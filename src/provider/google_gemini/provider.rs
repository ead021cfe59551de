use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::config::{GenerationDefaults, ProviderKind};
use crate::error::LLMError;
use crate::http::{
    HttpBodyStream, HttpClient, HttpStreamResponse, JsonResponse, RequestOptions, RetryPolicy,
};
use crate::provider::LLMProvider;
use crate::stream::TextStream;
use crate::types::{CapabilityDescriptor, UnifiedRequest, UnifiedResult};

use super::request::build_gemini_body;
use super::response::map_response;

/// Google Gemini provider. Streaming is not supported.
pub struct GoogleGeminiProvider {
    pub(crate) http: HttpClient,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) defaults: GenerationDefaults,
    pub(crate) retry: RetryPolicy,
}

impl GoogleGeminiProvider {
    /// Creates a provider that targets the default Generative Language endpoint.
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: ProviderKind::Gemini.default_base_url().to_string(),
            api_key: api_key.into(),
            defaults: GenerationDefaults::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
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

    /// `{base}/models/{model}:generateContent?key={key}`, with the model and key
    /// percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when the base URL cannot be parsed.
    pub(crate) fn endpoint(&self, model: &str) -> Result<String, LLMError> {
        let invalid = |reason: String| LLMError::InvalidConfig {
            field: "base_url".to_string(),
            reason,
        };
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| invalid(format!("invalid Gemini base URL: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("Gemini base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .push("models")
            .push(&format!("{}:generateContent", bare_model(model)));
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url.into())
    }
}

fn bare_model(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

#[async_trait]
impl LLMProvider for GoogleGeminiProvider {
    fn name(&self) -> &'static str {
        ProviderKind::Gemini.as_str()
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: false,
            supports_structured_output: true,
            hoists_system: true,
        }
    }

    fn normalize(&self, request: &UnifiedRequest) -> Result<Value, LLMError> {
        build_gemini_body(request, &self.defaults)
    }

    fn parse_response(
        &self,
        request: &UnifiedRequest,
        body: Value,
    ) -> Result<UnifiedResult, LLMError> {
        map_response(request, body, self.name())
    }

    fn decode_stream(&self, _body: HttpBodyStream) -> Result<TextStream, LLMError> {
        Err(LLMError::UnsupportedFeature {
            feature: "streaming output for gemini",
        })
    }

    async fn send(&self, request: &UnifiedRequest, body: Value) -> Result<JsonResponse, LLMError> {
        let options =
            RequestOptions::post(self.endpoint(&request.model)?, body).with_retry(self.retry);
        self.http.request(&options).await
    }

    async fn send_stream(
        &self,
        _request: &UnifiedRequest,
        _body: Value,
    ) -> Result<HttpStreamResponse, LLMError> {
        Err(LLMError::UnsupportedFeature {
            feature: "streaming output for gemini",
        })
    }
}
