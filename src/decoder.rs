//! Line-frame decoding for streamed chat completions.
//!
//! A streamed response body is a sequence of newline-delimited frames. Each frame
//! is either a JSON object carrying a text fragment, optionally prefixed with
//! `data:`, or the `[DONE]` sentinel. This module turns the raw byte stream into a
//! lazy stream of text fragments.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_FALLBACK_FRAMES, STREAM_FRAMES};
use crate::types::StreamChunk;
use crate::{Error, Result};

/// Payload that marks the graceful end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Prefix some providers put in front of every frame.
const DATA_PREFIX: &str = "data:";

/// What a single frame contributes to the fragment stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text fragment to hand to the consumer.
    Fragment(String),
    /// Nothing to emit: blank line or a control frame without text.
    Skip,
    /// The end-of-stream sentinel.
    Done,
}

/// Classify one line of a streamed body.
///
/// Frames that are not valid JSON are passed through verbatim rather than
/// dropped, so a provider that streams plain text still produces output.
pub fn decode_line(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() {
        return Frame::Skip;
    }
    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim(),
        None => line,
    };
    if payload.is_empty() {
        return Frame::Skip;
    }
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => match serde_json::from_value::<StreamChunk>(value) {
            Ok(chunk) => match chunk.text() {
                Some(text) => Frame::Fragment(text.to_string()),
                None => Frame::Skip,
            },
            Err(_) => Frame::Skip,
        },
        Err(err) => {
            STREAM_FALLBACK_FRAMES.click();
            tracing::debug!(error = %err, "passing through non-JSON stream frame");
            Frame::Fragment(payload.to_string())
        }
    }
}

/// Decoder state threaded through [`stream::unfold`].
struct LineFrames<S> {
    inner: S,
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
    finished: bool,
}

impl<S> LineFrames<S> {
    /// Remove the next newline-terminated line from the buffer.
    ///
    /// Splitting happens on bytes so that a multi-byte character cut in half by a
    /// chunk boundary is only decoded once both halves have arrived.
    fn take_line(&mut self) -> Option<String> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let pos = self.scanned + offset;
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        self.scanned = 0;
        Some(String::from_utf8_lossy(&line[..pos]).into_owned())
    }
}

/// Turn a response body into a stream of text fragments.
///
/// The returned stream is lazy and finite. It ends when the body completes or the
/// `[DONE]` sentinel is seen, whichever comes first. A trailing line that was
/// never terminated by a newline is dropped. A failure of the underlying body is
/// yielded once as [`Error::Streaming`], after which the stream ends.
pub fn decode_frames<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineFrames {
        inner: byte_stream,
        buffer: Vec::new(),
        scanned: 0,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            // Drain complete lines before reading more.
            while let Some(line) = state.take_line() {
                match decode_line(&line) {
                    Frame::Fragment(text) => {
                        STREAM_FRAMES.click();
                        return Some((Ok(text), state));
                    }
                    Frame::Skip => {}
                    Frame::Done => {
                        tracing::debug!("stream finished with sentinel");
                        return None;
                    }
                }
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(Error::streaming(
                            format!("Error in HTTP stream: {e}"),
                            Some(Box::new(e)),
                        )),
                        state,
                    ));
                }
                None => {
                    if !state.buffer.is_empty() {
                        tracing::debug!(
                            bytes = state.buffer.len(),
                            "dropping unterminated trailing line"
                        );
                    }
                    return None;
                }
            }
        }
    })
}
