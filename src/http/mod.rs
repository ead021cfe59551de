use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::LLMError;

pub mod reqwest;
mod retry;

pub use retry::RetryPolicy;
pub(crate) use retry::retry_with_policy;

/// Enumerates HTTP methods understood by the lightweight transport abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Minimal HTTP request representation handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Raw HTTP response as produced by a transport, before any decoding.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// HTTP response that carries a streaming body.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// Alias for the body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LLMError>> + Send>>;

/// Transport abstraction used to decouple providers from the concrete HTTP client.
///
/// Implementations only move bytes; status handling, retries and content
/// negotiation live in [`HttpClient`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    ///
    /// # Errors
    ///
    /// Implementations should map network failures to [`LLMError::Transport`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;

    /// Sends a request and returns a streaming body.
    ///
    /// # Errors
    ///
    /// Implementations should map network failures to [`LLMError::Transport`].
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Response body decoded according to the response content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Body of an `application/json` response.
    Json(Value),
    /// Any other body, kept verbatim.
    Text(String),
}

impl ResponseData {
    /// Returns the JSON value, parsing a text body once if needed.
    pub fn into_json(self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => serde_json::from_str(&text),
        }
    }
}

/// Decoded, successful (2xx) response.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: ResponseData,
}

/// Options for a single logical call made through [`HttpClient`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub retry: RetryPolicy,
}

impl RequestOptions {
    /// Builds a POST call with a JSON body and no retries.
    ///
    /// # Examples
    ///
    /// ```
    /// use one_llm::http::{HttpMethod, RequestOptions};
    /// use serde_json::json;
    ///
    /// let options = RequestOptions::post("https://example.com", json!({"ping": "pong"}))
    ///     .with_header("Authorization", "Bearer test");
    /// assert_eq!(options.method, HttpMethod::Post);
    /// assert_eq!(options.retry.retries, 0);
    /// ```
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            headers: HashMap::new(),
            body: Some(body),
            retry: RetryPolicy::none(),
        }
    }

    /// Adds or replaces one header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the retry policy used by [`HttpClient::request`].
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn to_http_request(&self) -> Result<HttpRequest, LLMError> {
        let mut headers = self.headers.clone();
        let body = match &self.body {
            Some(body) => {
                if header_value(&headers, "content-type").is_none() {
                    headers.insert("Content-Type".to_string(), "application/json".to_string());
                }
                let payload = serde_json::to_vec(body).map_err(|err| LLMError::Validation {
                    message: format!("failed to serialize request: {err}"),
                })?;
                Some(payload)
            }
            None => None,
        };
        Ok(HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body,
        })
    }
}

/// HTTP client layering status handling, content negotiation and retries over a
/// [`HttpTransport`].
#[derive(Clone)]
pub struct HttpClient {
    transport: DynHttpTransport,
}

impl HttpClient {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self { transport }
    }

    /// Performs a buffered call, retrying transport and status failures per
    /// `options.retry`.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Http`] for non-2xx responses, or whatever the transport
    /// reported on the last attempt.
    pub async fn request(&self, options: &RequestOptions) -> Result<JsonResponse, LLMError> {
        let request = options.to_http_request()?;
        retry_with_policy(options.retry, |attempt| {
            let request = request.clone();
            async move {
                tracing::debug!(url = log_url(&request.url), attempt, "sending request");
                let response = self.transport.send(request).await?;
                decode_response(response)
            }
        })
        .await
    }

    /// Performs a streaming call. Streams are never retried.
    ///
    /// # Errors
    ///
    /// A non-2xx response is drained and returned as [`LLMError::Http`].
    pub async fn request_stream(
        &self,
        options: &RequestOptions,
    ) -> Result<HttpStreamResponse, LLMError> {
        let request = options.to_http_request()?;
        tracing::debug!(url = log_url(&request.url), "opening stream");
        let response = self.transport.send_stream(request).await?;
        if (200..300).contains(&response.status) {
            return Ok(response);
        }
        let HttpStreamResponse {
            status,
            headers,
            body,
        } = response;
        let data = match collect_body(body).await {
            Ok(bytes) => decode_body(&headers, bytes),
            Err(err) => {
                tracing::debug!(status, error = %err, "failed to read error body");
                ResponseData::Text(String::new())
            }
        };
        Err(status_error(status, data))
    }
}

fn decode_response(response: HttpResponse) -> Result<JsonResponse, LLMError> {
    let HttpResponse {
        status,
        headers,
        body,
    } = response;
    let data = decode_body(&headers, body);
    if (200..300).contains(&status) {
        Ok(JsonResponse {
            status,
            headers,
            data,
        })
    } else {
        Err(status_error(status, data))
    }
}

/// URL without its query string, which may carry a credential.
fn log_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Decodes a body as JSON when the content type says so, otherwise as text.
pub(crate) fn decode_body(headers: &HashMap<String, String>, body: Vec<u8>) -> ResponseData {
    let is_json = header_value(headers, "content-type")
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"));
    if is_json {
        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            return ResponseData::Json(value);
        }
    }
    ResponseData::Text(String::from_utf8_lossy(&body).into_owned())
}

fn status_error(status: u16, body: ResponseData) -> LLMError {
    let message = match &body {
        ResponseData::Json(value) => value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        ResponseData::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
        ResponseData::Text(_) => format!("request failed with status {status}"),
    };
    LLMError::Http {
        status,
        message,
        body,
    }
}

/// Case-insensitive header lookup.
pub(crate) fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Reads a body stream to completion.
pub(crate) async fn collect_body(mut body: HttpBodyStream) -> Result<Vec<u8>, LLMError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(bytes)
}
