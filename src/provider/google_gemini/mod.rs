//! Google Gemini `generateContent` API.

mod provider;
mod request;
mod response;
mod types;

pub use provider::GoogleGeminiProvider;
