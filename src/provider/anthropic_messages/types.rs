use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct AnthropicMessageResponse {
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    pub(crate) content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct AnthropicContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub(crate) struct AnthropicUsage {
    #[serde(default)]
    pub(crate) input_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) output_tokens: Option<u64>,
}

/// One `data:` payload of a Messages stream. Only the fields needed for text
/// extraction are decoded.
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) delta: Option<AnthropicStreamDelta>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct AnthropicStreamDelta {
    #[serde(default)]
    pub(crate) text: Option<String>,
}
