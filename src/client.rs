use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, ProviderKind, build_provider, resolve_api_key};
use crate::error::LLMError;
use crate::http::reqwest::default_dyn_transport;
use crate::http::{DynHttpTransport, HttpClient};
use crate::provider::DynProvider;
use crate::stream::TextStream;
use crate::types::{
    CapabilityDescriptor, OutputMode, Prompt, StopSequences, UnifiedRequest, UnifiedResult,
};

/// Entry point for every call. Holds the transport and the client-wide configuration;
/// providers are built per call from the request.
#[derive(Clone)]
pub struct LLMClient {
    http: HttpClient,
    config: ClientConfig,
}

impl LLMClient {
    /// Creates a client over the given transport with default configuration.
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            http: HttpClient::new(transport),
            config: ClientConfig::default(),
        }
    }

    /// Creates a client backed by reqwest.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Transport`] when the HTTP client cannot be created.
    pub fn default_client() -> Result<Self, LLMError> {
        Ok(Self::new(default_dyn_transport()?))
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds the provider for `request`, resolving its credential.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::MissingCredential`] when no key is available.
    pub fn provider_for(&self, request: &UnifiedRequest) -> Result<DynProvider, LLMError> {
        let api_key = resolve_api_key(request.provider, request.api_key.as_deref())?;
        Ok(build_provider(
            request.provider,
            api_key,
            request.base_url.as_deref(),
            self.http.clone(),
            &self.config,
        ))
    }

    /// Capability descriptor of a provider kind.
    pub fn capabilities(&self, kind: ProviderKind) -> CapabilityDescriptor {
        build_provider(kind, String::new(), None, self.http.clone(), &self.config).capabilities()
    }

    /// Provider kinds that can serve [`OutputMode::Streaming`].
    pub fn providers_supporting_stream(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.capabilities(*kind).supports_stream)
            .collect()
    }

    /// Runs one request. Configuration errors surface before any network I/O.
    pub async fn run(&self, request: UnifiedRequest) -> Result<UnifiedResult, LLMError> {
        request.validate()?;
        let provider = self.provider_for(&request)?;
        provider.complete(&request).await
    }

    /// Prepares a prompt; nothing is sent until one of the accessors on the returned
    /// [`PromptRequest`] is awaited.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use one_llm::LLMClient;
    /// use one_llm::client::SendPromptOptions;
    /// use one_llm::config::ProviderKind;
    ///
    /// # async fn demo() -> Result<(), one_llm::LLMError> {
    /// let client = LLMClient::default_client()?;
    /// let text = client
    ///     .send_prompt(
    ///         "Explain ownership in one sentence",
    ///         SendPromptOptions::new("llama-3.1-8b-instant").with_provider(ProviderKind::Groq),
    ///     )
    ///     .get_text()
    ///     .await?;
    /// println!("{text}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn send_prompt(
        &self,
        prompt: impl Into<Prompt>,
        options: SendPromptOptions,
    ) -> PromptRequest<'_> {
        PromptRequest {
            client: self,
            request: options.into_request(prompt.into()),
        }
    }
}

/// Options accepted by [`LLMClient::send_prompt`].
///
/// Deserializable so call settings can live in a config file. Only `model` is required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SendPromptOptions {
    pub model: String,
    /// Defaults to [`ProviderKind::Groq`].
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stop: Option<StopSequences>,
    #[serde(default)]
    pub system: Option<String>,
}

impl SendPromptOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<StopSequences>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    fn into_request(self, prompt: Prompt) -> UnifiedRequest {
        UnifiedRequest {
            messages: prompt.into_messages(),
            model: self.model,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: self.stop,
            system: self.system,
            output_mode: OutputMode::Text,
            provider: self.provider.unwrap_or_default(),
            api_key: self.api_key,
            base_url: self.base_url,
        }
    }
}

/// A prepared prompt. Each accessor performs exactly one call (plus configured
/// retries) in its own output mode, so the same request can be reused.
pub struct PromptRequest<'a> {
    client: &'a LLMClient,
    request: UnifiedRequest,
}

impl PromptRequest<'_> {
    /// The request that the accessors will send.
    pub fn request(&self) -> &UnifiedRequest {
        &self.request
    }

    async fn run_as(&self, mode: OutputMode) -> Result<UnifiedResult, LLMError> {
        let request = self.request.clone().with_output_mode(mode);
        self.client.run(request).await
    }

    /// Returns the generated text.
    pub async fn get_text(&self) -> Result<String, LLMError> {
        Ok(self.run_as(OutputMode::Text).await?.text)
    }

    /// Requests JSON output and deserializes it into `T`.
    ///
    /// Text that is not valid JSON arrives as `{"raw": text}`, which deserializes
    /// into `serde_json::Value` but will usually not match a typed `T`.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Provider`] when the output does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(&self) -> Result<T, LLMError> {
        let result = self.run_as(OutputMode::Structured).await?;
        let value = result.structured.unwrap_or_default();
        serde_json::from_value(value).map_err(|err| {
            LLMError::provider(
                self.request.provider.as_str(),
                format!("structured output does not match the requested type: {err}"),
            )
        })
    }

    /// Returns the generated text as a stream of fragments.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::UnsupportedFeature`] for providers that cannot stream.
    pub async fn get_stream(&self) -> Result<TextStream, LLMError> {
        let result = self.run_as(OutputMode::Streaming).await?;
        result.stream.ok_or_else(|| {
            LLMError::provider(self.request.provider.as_str(), "provider returned no stream")
        })
    }
}
