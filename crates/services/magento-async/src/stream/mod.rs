//! Long-lived streaming calls.
//!
//! A stream is one spawned task that owns the HTTP response and a
//! [`StreamParser`]. Decoded events reach the consumer through an unbounded
//! channel wrapped by [`StreamReceiver`]; the task and the receiver share a
//! [`CancellationToken`] and the observable [`StreamState`].

mod framing;
mod message;
mod parser;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::MagentoError;
use crate::types::RawResponse;

pub use framing::{CrlfDelimited, Framing, LengthPrefixed};
pub use message::MessageKind;
pub use parser::StreamParser;

/// One item delivered by a [`StreamReceiver`]
#[derive(Debug)]
pub enum StreamEvent {
    /// A decoded JSON message
    Message(Value),
    /// Keep-alive (an empty frame)
    Ping,
    /// A frame that is not valid JSON; the stream keeps going
    Malformed {
        /// Frame text, lossily decoded
        raw: String,
        /// Decoder error
        error: String,
    },
    /// The server ended the response; always the last event
    End,
    /// Transport failure or non-success status; always the last event
    Error(MagentoError),
}

impl StreamEvent {
    /// Classification of a decoded message, `None` for other events
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::Message(v) => Some(MessageKind::of(v)),
            _ => None,
        }
    }

    /// True for [`End`](Self::End) and [`Error`](Self::Error)
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error(_))
    }
}

/// Why an opened stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The server ended the response body
    Normal,
    /// The connection or the opening response failed
    Error,
}

/// Lifecycle of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Request sent, no response yet
    Connecting,
    /// Response accepted, body being read
    Open,
    /// Ended by the server or by an error
    Closed(CloseReason),
    /// Destroyed by the consumer
    Cancelled,
}

impl StreamState {
    /// True once no further transition can happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed(_) | Self::Cancelled)
    }
}

/// Per-stream settings
#[derive(Debug, Clone)]
pub struct StreamOptions {
    framing: Arc<dyn Framing>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            framing: Arc::new(CrlfDelimited),
        }
    }
}

impl StreamOptions {
    /// Default options: `\r\n`-delimited messages
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom framing strategy
    #[must_use]
    pub fn with_framing(mut self, framing: impl Framing + 'static) -> Self {
        self.framing = Arc::new(framing);
        self
    }

    /// Reads length-prefixed messages
    ///
    /// The server only sends this framing when asked with
    /// `delimited=length` in the stream parameters.
    #[must_use]
    pub fn length_prefixed(self) -> Self {
        self.with_framing(LengthPrefixed)
    }

    /// Active framing strategy
    #[must_use]
    pub fn framing(&self) -> &dyn Framing {
        self.framing.as_ref()
    }
}

/// Consumer side of an open stream
///
/// Events arrive in wire order. After [`End`](StreamEvent::End) or
/// [`Error`](StreamEvent::Error) the channel closes and [`recv`](Self::recv)
/// returns `None`. Dropping the receiver destroys the stream.
#[derive(Debug)]
pub struct StreamReceiver {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    state: Arc<watch::Sender<StreamState>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl StreamReceiver {
    /// Spawns the network task for `request` and returns its receiver
    pub(crate) fn spawn(request: reqwest::RequestBuilder, options: StreamOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(watch::Sender::new(StreamState::Connecting));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            request,
            StreamParser::new(options.framing),
            tx,
            Arc::clone(&state),
            cancel.clone(),
        ));

        Self {
            rx,
            state,
            cancel,
            task,
        }
    }

    /// Receives the next event
    ///
    /// Returns `None` once the stream has finished or has been destroyed,
    /// even if events were still queued.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            ev = self.rx.recv() => ev,
        }
    }

    /// Stops the stream and tears the connection down
    ///
    /// Queued events are discarded. Calling it again, or after the stream
    /// closed on its own, has no further effect.
    pub fn destroy(&self) {
        if advance(&self.state, StreamState::Cancelled) {
            tracing::debug!("Stream destroyed");
        }
        self.cancel.cancel();
        self.task.abort();
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Watches lifecycle transitions
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// True once [`destroy`](Self::destroy) has been called
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for StreamReceiver {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl futures::Stream for StreamReceiver {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

/// Moves to `next` unless the stream already reached a terminal state
fn advance(state: &watch::Sender<StreamState>, next: StreamState) -> bool {
    state.send_if_modified(|s| {
        if s.is_terminal() {
            false
        } else {
            *s = next;
            true
        }
    })
}

async fn run(
    request: reqwest::RequestBuilder,
    mut parser: StreamParser,
    tx: mpsc::UnboundedSender<StreamEvent>,
    state: Arc<watch::Sender<StreamState>>,
    cancel: CancellationToken,
) {
    let fail = |err: MagentoError| {
        if advance(&state, StreamState::Closed(CloseReason::Error)) {
            tracing::debug!(error = %err, "Stream closed with error");
            let _ = tx.send(StreamEvent::Error(err));
        }
    };

    let sent = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        r = request.send() => r,
    };
    let mut response = match sent {
        Ok(r) => r,
        Err(e) => return fail(e.into()),
    };

    let status = response.status();
    if !status.is_success() {
        let headers = response.headers().clone();
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            b = response.bytes() => b.unwrap_or_default(),
        };
        return fail(status_error(RawResponse {
            status,
            headers,
            body,
        }));
    }

    if advance(&state, StreamState::Open) {
        tracing::debug!(status = status.as_u16(), "Stream open");
    }

    loop {
        let chunk: Result<Option<Bytes>, reqwest::Error> = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            c = response.chunk() => c,
        };

        match chunk {
            Ok(Some(chunk)) => {
                for event in parser.receive(&chunk) {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                let dropped = parser.finish();
                if dropped > 0 {
                    tracing::debug!(bytes = dropped, "Discarding incomplete trailing message");
                }
                if advance(&state, StreamState::Closed(CloseReason::Normal)) {
                    tracing::debug!("Stream ended");
                    let _ = tx.send(StreamEvent::End);
                }
                return;
            }
            Err(e) => return fail(e.into()),
        }
    }
}

fn status_error(raw: RawResponse) -> MagentoError {
    let body = serde_json::from_slice(&raw.body).ok();
    MagentoError::Status {
        status: raw.status,
        body,
        response: Box::new(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!StreamState::Connecting.is_terminal());
        assert!(!StreamState::Open.is_terminal());
        assert!(StreamState::Closed(CloseReason::Normal).is_terminal());
        assert!(StreamState::Closed(CloseReason::Error).is_terminal());
        assert!(StreamState::Cancelled.is_terminal());
    }

    #[test]
    fn advance_stops_at_terminal_state() {
        let state = watch::Sender::new(StreamState::Connecting);
        assert!(advance(&state, StreamState::Open));
        assert!(advance(&state, StreamState::Cancelled));
        assert!(!advance(&state, StreamState::Closed(CloseReason::Normal)));
        assert_eq!(*state.borrow(), StreamState::Cancelled);
    }

    #[test]
    fn event_kind_only_for_messages() {
        let ev = StreamEvent::Message(serde_json::json!({"delete": {}}));
        assert_eq!(ev.kind(), Some(MessageKind::Delete));
        assert_eq!(StreamEvent::Ping.kind(), None);
        assert!(StreamEvent::End.is_terminal());
        assert!(!StreamEvent::Ping.is_terminal());
    }

    #[test]
    fn default_options_use_crlf() {
        let s = format!("{:?}", StreamOptions::default().framing());
        assert!(s.contains("CrlfDelimited"));
        let s = format!("{:?}", StreamOptions::new().length_prefixed().framing());
        assert!(s.contains("LengthPrefixed"));
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_ends_recv() {
        let client = reqwest::Client::new();
        // Unroutable; the task is cancelled before it can fail.
        let req = client.get("http://127.0.0.1:9/never");
        let mut rx = StreamReceiver::spawn(req, StreamOptions::default());
        rx.destroy();
        rx.destroy();
        assert_eq!(rx.state(), StreamState::Cancelled);
        assert!(rx.is_destroyed());
        assert!(rx.recv().await.is_none());
    }
}
