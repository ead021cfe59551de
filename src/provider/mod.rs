use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::{HttpBodyStream, HttpStreamResponse, JsonResponse};
use crate::stream::TextStream;
use crate::types::{CapabilityDescriptor, OutputMode, UnifiedRequest, UnifiedResult};

pub mod anthropic_messages;
pub mod google_gemini;
pub mod openai_chat;
pub mod structured;

/// Unified provider interface.
///
/// Each provider family implements the three translation steps (`normalize`,
/// `parse_response`, `decode_stream`) plus the two wire calls; [`LLMProvider::complete`]
/// strings them together for one call.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Describes what the provider supports.
    fn capabilities(&self) -> CapabilityDescriptor;

    /// Translates a unified request into the provider's wire body.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::UnsupportedFeature`] when the requested output mode cannot be
    /// served by this provider.
    fn normalize(&self, request: &UnifiedRequest) -> Result<Value, LLMError>;

    /// Extracts text, usage, model and finish reason from a non-streaming response body.
    fn parse_response(
        &self,
        request: &UnifiedRequest,
        body: Value,
    ) -> Result<UnifiedResult, LLMError>;

    /// Wraps a streaming response body into a lazy fragment stream.
    fn decode_stream(&self, body: HttpBodyStream) -> Result<TextStream, LLMError>;

    /// Sends a normalized body and waits for the buffered response.
    async fn send(&self, request: &UnifiedRequest, body: Value) -> Result<JsonResponse, LLMError>;

    /// Sends a normalized body and returns the raw byte stream.
    async fn send_stream(
        &self,
        request: &UnifiedRequest,
        body: Value,
    ) -> Result<HttpStreamResponse, LLMError>;

    /// Converts a response body into a [`UnifiedResult`], parsing the text as JSON in
    /// structured mode.
    fn denormalize(&self, request: &UnifiedRequest, body: Value) -> Result<UnifiedResult, LLMError> {
        let mut result = self.parse_response(request, body)?;
        if request.output_mode == OutputMode::Structured {
            result.structured = Some(structured::parse_structured(&result.text));
        }
        Ok(result)
    }

    /// Runs one call end to end: validate, normalize, send, then denormalize or wrap the
    /// stream depending on the output mode.
    async fn complete(&self, request: &UnifiedRequest) -> Result<UnifiedResult, LLMError> {
        request.validate()?;
        let body = self.normalize(request)?;
        tracing::debug!(
            provider = self.name(),
            model = %request.model,
            mode = ?request.output_mode,
            "dispatching request"
        );

        if request.output_mode == OutputMode::Streaming {
            let response = self.send_stream(request, body).await?;
            let stream = self.decode_stream(response.body)?;
            return Ok(UnifiedResult::streaming(stream));
        }

        let response = self.send(request, body).await?;
        let value = response.data.into_json().map_err(|err| {
            LLMError::provider(self.name(), format!("response body is not JSON: {err}"))
        })?;
        self.denormalize(request, value)
    }
}

/// Thread-safe provider handle.
pub type DynProvider = Arc<dyn LLMProvider>;

/// Joins a base URL and a path, tolerating a trailing slash on the base.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;

    use crate::error::LLMError;
    use crate::http::{DynHttpTransport, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};

    use std::sync::Arc;

    /// Transport that fails the test if any request reaches it.
    pub(crate) struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("unexpected network call to {}", request.url);
        }

        async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            panic!("unexpected network call to {}", request.url);
        }
    }

    pub(crate) fn panic_transport() -> DynHttpTransport {
        Arc::new(PanicTransport)
    }
}
