use crate::stream::{EventOutcome, Framing};

use super::types::OpenAiStreamChunk;

const DONE_MARKER: &str = "[DONE]";

/// `data:` framing used by Chat Completions streams, terminated by `[DONE]`.
#[derive(Debug, Clone)]
pub struct OpenAiFraming {
    provider: &'static str,
}

impl OpenAiFraming {
    pub fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

impl Framing for OpenAiFraming {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn decode_event(&mut self, payload: &str) -> EventOutcome {
        if payload == DONE_MARKER {
            return EventOutcome::Stop;
        }
        let chunk: OpenAiStreamChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::debug!(provider = self.provider, error = %err, "skipping malformed stream event");
                return EventOutcome::Skip;
            }
        };
        let fragment = chunk.choices.into_iter().next().and_then(|choice| {
            choice
                .delta
                .and_then(|delta| delta.content)
                .filter(|content| !content.is_empty())
                .or(choice.text)
        });
        match fragment {
            Some(text) if !text.is_empty() => EventOutcome::Emit(text),
            _ => EventOutcome::Skip,
        }
    }
}
