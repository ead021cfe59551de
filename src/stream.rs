use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;

/// Ordered, single-consumer sequence of generated text fragments.
///
/// Dropping the stream releases the underlying response body.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// What a framing made of one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to emit for this event.
    Skip,
    /// A text fragment to hand to the consumer.
    Emit(String),
    /// Terminal marker; nothing after it is emitted.
    Stop,
}

/// Provider-specific interpretation of `data:` payloads.
pub trait Framing: Send + Unpin + 'static {
    /// Provider identifier used in logs.
    fn provider(&self) -> &'static str;

    /// Interprets the payload that followed a `data:` prefix (already trimmed).
    fn decode_event(&mut self, payload: &str) -> EventOutcome;
}

/// Line-oriented event decoder shared by every streaming provider.
///
/// Bytes are buffered until a newline; the trailing partial line is carried to the
/// next read and flushed as a final line when the body ends. Lines are decoded as
/// UTF-8 only once complete, so multi-byte characters split across reads survive.
pub struct FragmentStream<F: Framing> {
    body: Option<HttpBodyStream>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    framing: F,
    finished: bool,
}

impl<F: Framing> FragmentStream<F> {
    pub fn new(body: HttpBodyStream, framing: F) -> Self {
        Self {
            body: Some(body),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            framing,
            finished: false,
        }
    }

    /// Wraps the decoder into a boxed [`TextStream`].
    pub fn boxed(self) -> TextStream {
        Box::pin(self)
    }

    fn release(&mut self) {
        self.body = None;
        self.buffer.clear();
        self.finished = true;
    }

    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&line);
            if self.finished {
                return;
            }
        }
    }

    fn handle_line(&mut self, line: &[u8]) {
        let Ok(text) = std::str::from_utf8(line) else {
            tracing::debug!(
                provider = self.framing.provider(),
                "skipping stream line with invalid UTF-8"
            );
            return;
        };
        let Some(payload) = text.trim().strip_prefix("data:") else {
            return;
        };
        match self.framing.decode_event(payload.trim()) {
            EventOutcome::Skip => {}
            EventOutcome::Emit(fragment) => {
                tracing::trace!(provider = self.framing.provider(), len = fragment.len(), "fragment");
                self.pending.push_back(fragment);
            }
            EventOutcome::Stop => {
                tracing::debug!(provider = self.framing.provider(), "stream terminator received");
                self.release();
            }
        }
    }

    fn flush_remaining(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&line);
        }
        self.release();
    }
}

impl<F: Framing> Stream for FragmentStream<F> {
    type Item = Result<String, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(fragment) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(fragment)));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            let Some(body) = this.body.as_mut() else {
                this.finished = true;
                continue;
            };

            match body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    this.drain_lines();
                }
                Poll::Ready(Some(Err(err))) => {
                    this.release();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.flush_remaining(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures_util::{StreamExt, stream};

    use super::*;

    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Body built from in-memory chunks.
    pub(crate) fn body(chunks: &[&str]) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, LLMError>> =
            chunks.iter().map(|chunk| Ok(chunk.as_bytes().to_vec())).collect();
        Box::pin(stream::iter(chunks))
    }

    /// Body that never ends after `chunks`, with a flag set once it is dropped.
    pub(crate) fn endless_tracked_body(chunks: Vec<Vec<u8>>) -> (HttpBodyStream, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let guard = ReleaseFlag(released.clone());
        let body = stream::iter(chunks.into_iter().map(Ok))
            .chain(stream::pending())
            .map(move |chunk: Result<Vec<u8>, LLMError>| {
                let _guard = &guard;
                chunk
            });
        (Box::pin(body), released)
    }

    pub(crate) fn is_released(flag: &Arc<AtomicBool>) -> bool {
        flag.load(Ordering::SeqCst)
    }
}
