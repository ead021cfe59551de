//! OpenAI Chat Completions wire format, shared by every OpenAI-compatible vendor.

mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OpenAiChatProvider;
pub use stream::OpenAiFraming;
