//! Provider-agnostic request and result shapes.
//!
//! Callers build a [`UnifiedRequest`] once and receive a [`UnifiedResult`] regardless
//! of which provider family served the call.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderKind;
use crate::error::LLMError;
use crate::stream::TextStream;

/// Conversational role shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation.
///
/// # Examples
///
/// ```
/// use one_llm::types::{Message, Role};
///
/// let msg = Message::user("Describe Rust in one sentence");
/// assert_eq!(msg.role, Role::User);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Either a bare prompt or a full message list.
///
/// A bare prompt is shorthand for a single user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Messages(Vec<Message>),
}

impl Prompt {
    /// Expands the prompt into an ordered message list.
    ///
    /// # Examples
    ///
    /// ```
    /// use one_llm::types::{Message, Prompt};
    ///
    /// let messages = Prompt::from("hello").into_messages();
    /// assert_eq!(messages, vec![Message::user("hello")]);
    /// ```
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Prompt::Text(text) => vec![Message::user(text)],
            Prompt::Messages(messages) => messages,
        }
    }
}

impl From<&str> for Prompt {
    fn from(value: &str) -> Self {
        Prompt::Text(value.to_string())
    }
}

impl From<String> for Prompt {
    fn from(value: String) -> Self {
        Prompt::Text(value)
    }
}

impl From<Vec<Message>> for Prompt {
    fn from(value: Vec<Message>) -> Self {
        Prompt::Messages(value)
    }
}

/// Stop condition given as one sequence or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    /// Flattens into a list; `None` when the list would be empty.
    pub fn to_list(&self) -> Option<Vec<String>> {
        match self {
            StopSequences::One(value) => Some(vec![value.clone()]),
            StopSequences::Many(values) if values.is_empty() => None,
            StopSequences::Many(values) => Some(values.clone()),
        }
    }
}

impl From<&str> for StopSequences {
    fn from(value: &str) -> Self {
        StopSequences::One(value.to_string())
    }
}

impl From<Vec<String>> for StopSequences {
    fn from(value: Vec<String>) -> Self {
        StopSequences::Many(value)
    }
}

/// How the caller wants the generated text delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    Text,
    /// Text additionally parsed as JSON.
    Structured,
    /// Text delivered as incremental fragments.
    Streaming,
}

/// Provider-agnostic request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRequest {
    pub messages: Vec<Message>,
    pub model: String,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stop: Option<StopSequences>,
    /// Explicit system instruction; wins over any system message in `messages`.
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default)]
    pub provider: ProviderKind,
    /// Explicit credential; falls back to the provider's environment variable.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl UnifiedRequest {
    /// Creates a text-mode request for the default provider.
    pub fn new(prompt: impl Into<Prompt>, model: impl Into<String>) -> Self {
        Self {
            messages: prompt.into().into_messages(),
            model: model.into(),
            max_output_tokens: None,
            temperature: None,
            top_p: None,
            stop: None,
            system: None,
            output_mode: OutputMode::Text,
            provider: ProviderKind::default(),
            api_key: None,
            base_url: None,
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
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

    /// Checks the invariants every provider relies on.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Validation`] when the model is blank or there are no messages.
    pub fn validate(&self) -> Result<(), LLMError> {
        if self.model.trim().is_empty() {
            return Err(LLMError::Validation {
                message: "model is required".to_string(),
            });
        }
        if self.messages.is_empty() {
            return Err(LLMError::Validation {
                message: "at least one message is required".to_string(),
            });
        }
        Ok(())
    }

    /// Resolves the system instruction: the explicit one, else the first system message.
    pub(crate) fn system_instruction(&self) -> Option<&str> {
        self.system.as_deref().or_else(|| {
            self.messages
                .iter()
                .find(|message| message.role == Role::System)
                .map(|message| message.content.as_str())
        })
    }

    /// Messages with every system-role entry removed.
    pub(crate) fn conversation(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|message| message.role != Role::System)
    }
}

/// Token accounting. `total_tokens` is always `prompt_tokens + completion_tokens`,
/// saturating at `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Builds usage from provider counters, treating a missing counter as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use one_llm::types::TokenUsage;
    ///
    /// let usage = TokenUsage::from_counts(Some(7), None);
    /// assert_eq!(usage.total_tokens, 7);
    /// ```
    pub fn from_counts(prompt: Option<u64>, completion: Option<u64>) -> Self {
        let prompt_tokens = prompt.unwrap_or(0);
        let completion_tokens = completion.unwrap_or(0);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Capability flags advertised by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Whether the provider supports [`OutputMode::Streaming`].
    pub supports_stream: bool,
    /// Whether the provider can be asked for JSON output natively.
    pub supports_structured_output: bool,
    /// Whether system instructions are carried in a dedicated field rather than
    /// as a message.
    pub hoists_system: bool,
}

/// Provider-agnostic result.
#[derive(Default)]
pub struct UnifiedResult {
    /// Generated text, empty when nothing was produced or in streaming mode.
    pub text: String,
    pub usage: Option<TokenUsage>,
    /// Model identifier reported by the provider.
    pub model: Option<String>,
    /// Raw stop/finish reason reported by the provider.
    pub finish_reason: Option<String>,
    /// Parsed text; only set in [`OutputMode::Structured`].
    pub structured: Option<Value>,
    /// Incremental text; only set in [`OutputMode::Streaming`].
    pub stream: Option<TextStream>,
}

impl UnifiedResult {
    pub(crate) fn streaming(stream: TextStream) -> Self {
        Self {
            stream: Some(stream),
            ..Self::default()
        }
    }
}

impl fmt::Debug for UnifiedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedResult")
            .field("text", &self.text)
            .field("usage", &self.usage)
            .field("model", &self.model)
            .field("finish_reason", &self.finish_reason)
            .field("structured", &self.structured)
            .field("stream", &self.stream.as_ref().map(|_| "TextStream"))
            .finish()
    }
}
