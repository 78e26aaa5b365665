//! Message framing strategies for stream bodies.
//!
//! A framing strategy only decides where one message ends; decoding is done
//! by [`StreamParser`](super::StreamParser).

use bytes::{Buf, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// Splits a byte buffer into message frames
pub trait Framing: Send + Sync + std::fmt::Debug {
    /// Removes the next complete frame from the front of `buffer`
    ///
    /// Returns `None`, leaving `buffer` untouched, when no complete frame is
    /// available yet. An empty frame denotes a keep-alive.
    fn try_extract_one(&self, buffer: &mut BytesMut) -> Option<Bytes>;
}

/// Messages terminated by `\r\n`
///
/// This is the default framing of the streaming hosts. Blank lines are
/// keep-alives.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrlfDelimited;

impl Framing for CrlfDelimited {
    fn try_extract_one(&self, buffer: &mut BytesMut) -> Option<Bytes> {
        let idx = find(buffer, CRLF)?;
        let frame = buffer.split_to(idx).freeze();
        buffer.advance(CRLF.len());
        Some(frame)
    }
}

/// Messages preceded by their byte length (`delimited=length`)
///
/// Each message is announced by a line holding its length in decimal,
/// terminated by `\r\n`; the announced bytes follow and include the
/// message's own trailing `\r\n`, which is not part of the frame. Blank lines
/// between messages are keep-alives. A length line that is not a number is
/// surfaced as a frame on its own so the parser reports it; so is a length too
/// large to address.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPrefixed;

impl Framing for LengthPrefixed {
    fn try_extract_one(&self, buffer: &mut BytesMut) -> Option<Bytes> {
        let line_end = find(buffer, CRLF)?;
        if line_end == 0 {
            buffer.advance(CRLF.len());
            return Some(Bytes::new());
        }

        let Some(len) = std::str::from_utf8(&buffer[..line_end])
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        else {
            let frame = buffer.split_to(line_end).freeze();
            buffer.advance(CRLF.len());
            return Some(frame);
        };

        let start = line_end + CRLF.len();
        let Some(end) = start.checked_add(len) else {
            let frame = buffer.split_to(line_end).freeze();
            buffer.advance(CRLF.len());
            return Some(frame);
        };
        if buffer.len() < end {
            return None;
        }

        buffer.advance(start);
        let mut frame = buffer.split_to(len).freeze();
        if frame.ends_with(CRLF) {
            frame.truncate(frame.len() - CRLF.len());
        }
        Some(frame)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
