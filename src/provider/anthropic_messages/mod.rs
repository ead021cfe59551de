//! Anthropic Messages API.

mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::AnthropicMessagesProvider;
pub use stream::AnthropicFraming;
