use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::http::{HttpClient, RetryPolicy};
use crate::provider::DynProvider;
use crate::provider::anthropic_messages::AnthropicMessagesProvider;
use crate::provider::google_gemini::GoogleGeminiProvider;
use crate::provider::openai_chat::OpenAiChatProvider;

/// Supported providers.
///
/// Every OpenAI-compatible vendor shares one wire format and differs only in base URL
/// and credential variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    #[default]
    Groq,
    OpenRouter,
    DeepSeek,
    Mistral,
    Perplexity,
    Anthropic,
    Gemini,
}

/// Wire-format family a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    OpenAiCompatible,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 8] = [
        ProviderKind::OpenAi,
        ProviderKind::Groq,
        ProviderKind::OpenRouter,
        ProviderKind::DeepSeek,
        ProviderKind::Mistral,
        ProviderKind::Perplexity,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Perplexity => "perplexity",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderKind::Anthropic => ProviderFamily::Anthropic,
            ProviderKind::Gemini => ProviderFamily::Gemini,
            _ => ProviderFamily::OpenAiCompatible,
        }
    }

    /// Environment variable consulted when no explicit key is given.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::Mistral => "MISTRAL_API_KEY",
            ProviderKind::Perplexity => "PERPLEXITY_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::DeepSeek => "https://api.deepseek.com",
            ProviderKind::Mistral => "https://api.mistral.ai/v1",
            ProviderKind::Perplexity => "https://api.perplexity.ai",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    /// Parses a provider identifier, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use one_llm::config::ProviderKind;
    ///
    /// assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    /// assert!("cohere".parse::<ProviderKind>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LLMError::InvalidConfig {
                field: "provider".to_string(),
                reason: format!("unsupported provider: {wanted}"),
            })
    }
}

/// Sampling defaults applied when a request leaves a parameter unset.
///
/// The record is immutable once handed to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
}

impl GenerationDefaults {
    /// Defaults that leave every unset parameter to the provider.
    pub fn none() -> Self {
        Self {
            max_output_tokens: None,
            temperature: None,
            top_p: None,
        }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_output_tokens: Some(1024),
            temperature: Some(0.7),
            top_p: Some(1.0),
        }
    }
}

/// Client-wide settings shared by every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub defaults: GenerationDefaults,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Value of the `anthropic-version` header.
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            defaults: GenerationDefaults::default(),
            retry: RetryPolicy::default(),
            anthropic_version: default_anthropic_version(),
        }
    }
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

/// Resolves the credential: explicit value first, then the provider's variable.
///
/// Blank values count as absent.
///
/// # Errors
///
/// Returns [`LLMError::MissingCredential`] when neither source yields a key.
pub fn resolve_api_key(kind: ProviderKind, explicit: Option<&str>) -> Result<String, LLMError> {
    explicit
        .map(str::to_string)
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            env::var(kind.env_var())
                .ok()
                .filter(|key| !key.trim().is_empty())
        })
        .ok_or(LLMError::MissingCredential {
            provider: kind.as_str(),
            env_var: kind.env_var(),
        })
}

/// Builds the provider client for `kind`.
///
/// `base_url` overrides the provider default when present.
pub fn build_provider(
    kind: ProviderKind,
    api_key: String,
    base_url: Option<&str>,
    http: HttpClient,
    config: &ClientConfig,
) -> DynProvider {
    let base_url = base_url.unwrap_or(kind.default_base_url());
    match kind.family() {
        ProviderFamily::OpenAiCompatible => Arc::new(
            OpenAiChatProvider::new(http, api_key)
                .with_name(kind.as_str())
                .with_base_url(base_url)
                .with_defaults(config.defaults)
                .with_retry(config.retry),
        ),
        ProviderFamily::Anthropic => Arc::new(
            AnthropicMessagesProvider::new(http, api_key)
                .with_base_url(base_url)
                .with_version(config.anthropic_version.clone())
                .with_defaults(config.defaults)
                .with_retry(config.retry),
        ),
        ProviderFamily::Gemini => Arc::new(
            GoogleGeminiProvider::new(http, api_key)
                .with_base_url(base_url)
                .with_defaults(config.defaults)
                .with_retry(config.retry),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    #[test]
    fn every_kind_round_trips_through_its_identifier() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let err = "cohere".parse::<ProviderKind>().expect_err("unknown provider");
        match err {
            LLMError::InvalidConfig { field, reason } => {
                assert_eq!(field, "provider");
                assert!(reason.contains("cohere"), "unexpected reason: {reason}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn families_group_openai_compatible_vendors() {
        assert_eq!(ProviderKind::Groq.family(), ProviderFamily::OpenAiCompatible);
        assert_eq!(ProviderKind::Perplexity.family(), ProviderFamily::OpenAiCompatible);
        assert_eq!(ProviderKind::Anthropic.family(), ProviderFamily::Anthropic);
        assert_eq!(ProviderKind::Gemini.family(), ProviderFamily::Gemini);
        assert_eq!(ProviderKind::default(), ProviderKind::Groq);
    }

    #[test]
    fn explicit_key_wins_and_blank_counts_as_missing() {
        assert_eq!(
            resolve_api_key(ProviderKind::Mistral, Some("explicit")).unwrap(),
            "explicit"
        );

        // PERPLEXITY_API_KEY is not expected to be set in test environments.
        if env::var("PERPLEXITY_API_KEY").is_err() {
            let err = resolve_api_key(ProviderKind::Perplexity, Some("  ")).expect_err("blank");
            assert!(matches!(
                err,
                LLMError::MissingCredential {
                    provider: "perplexity",
                    env_var: "PERPLEXITY_API_KEY"
                }
            ));
        }
    }

    #[test]
    fn client_config_fills_missing_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"retry":{"retries":3}}"#).expect("config");
        assert_eq!(config.retry.retries, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(1000));
        assert_eq!(config.defaults, GenerationDefaults::default());
        assert_eq!(config.anthropic_version, "2023-06-01");
    }

    #[test]
    fn build_provider_covers_every_kind() {
        let http = HttpClient::new(default_dyn_transport().expect("transport"));
        let config = ClientConfig::default();
        for kind in ProviderKind::ALL {
            let provider = build_provider(kind, "test-key".to_string(), None, http.clone(), &config);
            assert_eq!(provider.name(), kind.as_str());
        }
    }
}
