use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Method};

use crate::error::LLMError;

use super::{
    DynHttpTransport, HttpBodyStream, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport,
};

/// Default [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a preconfigured `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with reqwest defaults.
    pub fn default_client() -> Result<Self, LLMError> {
        Self::build(Client::builder())
    }

    /// Builds a transport whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, LLMError> {
        Self::build(Client::builder().timeout(timeout))
    }

    fn build(builder: reqwest::ClientBuilder) -> Result<Self, LLMError> {
        builder
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn build_request(&self, mut request: HttpRequest) -> Result<reqwest::RequestBuilder, LLMError> {
        let mut builder = self.client.request(Self::method(request.method), &request.url);

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LLMError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                LLMError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(body) = request.body.take() {
            builder = builder.body(body);
        }

        Ok(builder)
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<reqwest::Response, LLMError> {
        self.build_request(request)?
            .send()
            .await
            .map_err(|err| LLMError::transport(err.to_string()))
    }

    fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let response = self.dispatch(request).await?;
        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| LLMError::transport(err.to_string()))?
            .to_vec();
        tracing::trace!(status, bytes = body.len(), "received response body");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let response = self.dispatch(request).await?;
        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|err| LLMError::transport(err.to_string()))
        });
        let body: HttpBodyStream = Box::pin(stream);

        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds a shareable reqwest-backed transport.
pub fn default_dyn_transport() -> Result<DynHttpTransport, LLMError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: HashMap<String, String>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: "http://127.0.0.1:9/messages".to_string(),
            headers,
            body: Some(b"{}".to_vec()),
        }
    }

    #[test]
    fn builds_request_with_headers_and_body() {
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(30)).expect("transport");
        let built = transport
            .build_request(request(HashMap::from([(
                "x-api-key".to_string(),
                "secret".to_string(),
            )])))
            .expect("request")
            .build()
            .expect("reqwest request");

        assert_eq!(built.method(), Method::POST);
        assert_eq!(built.headers()["x-api-key"], "secret");
        assert_eq!(built.body().and_then(|body| body.as_bytes()), Some(b"{}".as_slice()));
    }

    #[test]
    fn invalid_header_is_a_transport_error() {
        let transport = ReqwestTransport::default_client().expect("transport");
        let err = transport
            .build_request(request(HashMap::from([(
                "bad header".to_string(),
                "v".to_string(),
            )])))
            .map(|_| ())
            .expect_err("invalid header name");
        assert!(matches!(err, LLMError::Transport { .. }));
    }
}
