use std::sync::Arc;

use bytes::BytesMut;

use super::StreamEvent;
use super::framing::{CrlfDelimited, Framing};

/// Incremental decoder turning body chunks into stream events
///
/// The buffer is owned by this parser alone. Between calls to
/// [`receive`](Self::receive) it holds at most one incomplete frame.
#[derive(Debug)]
pub struct StreamParser {
    buffer: BytesMut,
    framing: Arc<dyn Framing>,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new(Arc::new(CrlfDelimited))
    }
}

impl StreamParser {
    /// Creates a parser using the given framing
    #[must_use]
    pub fn new(framing: Arc<dyn Framing>) -> Self {
        Self {
            buffer: BytesMut::new(),
            framing,
        }
    }

    /// Appends a chunk and decodes every complete frame, in order
    ///
    /// Empty frames become [`StreamEvent::Ping`]; frames that are not JSON
    /// become [`StreamEvent::Malformed`].
    pub fn receive(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(frame) = self.framing.try_extract_one(&mut self.buffer) {
            if frame.iter().all(u8::is_ascii_whitespace) {
                tracing::debug!("Keep-alive");
                events.push(StreamEvent::Ping);
                continue;
            }

            match serde_json::from_slice(&frame) {
                Ok(value) => events.push(StreamEvent::Message(value)),
                Err(e) => {
                    let raw = String::from_utf8_lossy(&frame).into_owned();
                    tracing::warn!(error = %e, len = frame.len(), "Malformed stream message");
                    events.push(StreamEvent::Malformed {
                        raw,
                        error: e.to_string(),
                    });
                }
            }
        }
        events
    }

    /// Bytes of the incomplete frame currently buffered
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drops any incomplete frame, returning how many bytes were discarded
    pub fn finish(&mut self) -> usize {
        let n = self.buffer.len();
        self.buffer.clear();
        n
    }
}
