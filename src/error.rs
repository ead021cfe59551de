use thiserror::Error;

use crate::http::ResponseData;

/// Aggregates every failure mode exposed by the unified LLM client.
///
/// Variants fall into three groups. Configuration failures (`MissingCredential`,
/// `InvalidConfig`, `UnsupportedFeature`, `Validation`) are raised before any network
/// I/O and are never retried. Transport failures (`Transport`, `Http`) are retried
/// according to the configured [`crate::http::RetryPolicy`]. Decode failures
/// (`Provider`) surface responses that could not be interpreted at all.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Non-2xx response, carrying the decoded body.
    #[error("request failed with status {status}: {message}")]
    Http {
        /// HTTP status code returned by the server.
        status: u16,
        /// Provider error message when one could be extracted, otherwise a summary.
        message: String,
        /// Response body decoded as JSON or text.
        body: ResponseData,
    },
    /// No credential was supplied explicitly nor found in the environment.
    #[error("missing API key for {provider}: set api_key or {env_var}")]
    MissingCredential {
        /// Provider identifier, such as `groq`.
        provider: &'static str,
        /// Environment variable consulted as fallback.
        env_var: &'static str,
    },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Declares that a capability is not supported by the selected provider.
    #[error("feature unsupported: {feature}")]
    UnsupportedFeature { feature: &'static str },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Wraps provider responses that cannot be normalized.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider, such as `openai_chat`.
        provider: &'static str,
        /// Human-readable error message.
        message: String,
    },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use one_llm::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given provider name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use one_llm::error::LLMError;
    ///
    /// let err = LLMError::provider("openai_chat", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai_chat", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Returns the HTTP status carried by an [`LLMError::Http`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for failures raised before any request left the process.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::InvalidConfig { .. }
                | Self::UnsupportedFeature { .. }
                | Self::Validation { .. }
        )
    }

    /// Returns `true` when the retry policy applies to this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_helpers_classify_variants() {
        let missing = LLMError::MissingCredential {
            provider: "groq",
            env_var: "GROQ_API_KEY",
        };
        assert!(missing.is_configuration());
        assert!(!missing.is_retryable());
        assert_eq!(
            missing.to_string(),
            "missing API key for groq: set api_key or GROQ_API_KEY"
        );

        let http = LLMError::Http {
            status: 503,
            message: "overloaded".to_string(),
            body: ResponseData::Text("overloaded".to_string()),
        };
        assert!(http.is_retryable());
        assert!(!http.is_configuration());
        assert_eq!(http.status(), Some(503));

        assert_eq!(LLMError::transport("reset").status(), None);
    }
}
