use crate::config::ProviderKind;
use crate::stream::{EventOutcome, Framing};

use super::types::AnthropicStreamEvent;

/// Messages stream framing: text arrives in `content_block_delta` events.
///
/// The stream has no `[DONE]` marker; it ends with the body or at `message_stop`.
#[derive(Debug, Clone, Default)]
pub struct AnthropicFraming;

impl Framing for AnthropicFraming {
    fn provider(&self) -> &'static str {
        ProviderKind::Anthropic.as_str()
    }

    fn decode_event(&mut self, payload: &str) -> EventOutcome {
        let event: AnthropicStreamEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(provider = self.provider(), error = %err, "skipping malformed stream event");
                return EventOutcome::Skip;
            }
        };
        match event.kind.as_str() {
            "content_block_delta" => match event.delta.and_then(|delta| delta.text) {
                Some(text) if !text.is_empty() => EventOutcome::Emit(text),
                _ => EventOutcome::Skip,
            },
            "message_stop" => EventOutcome::Stop,
            _ => EventOutcome::Skip,
        }
    }
}
