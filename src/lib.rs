//! One request shape and one result shape over several LLM HTTP providers.
//!
//! OpenAI-compatible vendors, Anthropic Messages and Google Gemini are normalized behind
//! [`LLMProvider`]; [`LLMClient`] is the call surface.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod stream;
pub mod types;

pub use client::{LLMClient, PromptRequest, SendPromptOptions};
pub use config::ProviderKind;
pub use error::LLMError;
pub use provider::{DynProvider, LLMProvider};
pub use stream::TextStream;
pub use types::*;
