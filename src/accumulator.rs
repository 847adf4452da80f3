//! Accumulates streamed fragments into the trailing assistant turn of a session.
//!
//! Each fragment extends a running string and the session's trailing assistant
//! turn is replaced with that string through one store operation, so observers of
//! the store only ever see whole, persisted states. Cancellation is cooperative:
//! the token is checked before every read and, once triggered, the fragment stream
//! is dropped, which closes the HTTP connection.

use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::observability::{STREAM_CANCELLATIONS, STREAM_DURATION, STREAM_ERRORS};
use crate::render::StreamObserver;
use crate::store::SessionStore;
use crate::types::{GenerationRequest, SessionId};
use crate::{GithubModels, Result};

/// How a streamed reply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    /// The full reply as applied to the session.
    pub content: String,
    /// Number of fragments applied.
    pub fragments: usize,
    /// True if the stream was cut short by the cancellation token.
    pub cancelled: bool,
}

/// Merges fragments of one in-flight request into one session.
pub struct StreamAccumulator<'a> {
    store: &'a SessionStore,
    session_id: SessionId,
    content: String,
    fragments: usize,
}

impl<'a> StreamAccumulator<'a> {
    /// Accumulate into the trailing assistant turn of `session_id`.
    pub fn new(store: &'a SessionStore, session_id: SessionId) -> Self {
        Self {
            store,
            session_id,
            content: String::new(),
            fragments: 0,
        }
    }

    /// The reply accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Apply one fragment.
    ///
    /// The first fragment creates the assistant turn; later ones replace its
    /// content with the cumulative text. If the store rejects the update, the
    /// accumulated text is left as it was.
    pub fn accumulate(&mut self, fragment: &str) -> Result<()> {
        let mut next = String::with_capacity(self.content.len() + fragment.len());
        next.push_str(&self.content);
        next.push_str(fragment);
        self.store
            .replace_trailing_assistant(&self.session_id, next.clone())?;
        self.content = next;
        self.fragments += 1;
        Ok(())
    }

    /// Consume `fragments` until they end, fail, or `cancel` fires.
    ///
    /// Cancellation is not an error: the partial reply stays in the session and the
    /// summary reports `cancelled`. A stream that ends before any fragment leaves
    /// the session without an assistant turn.
    pub async fn drive<S>(
        mut self,
        fragments: S,
        cancel: &CancellationToken,
        observer: &mut dyn StreamObserver,
    ) -> Result<StreamSummary>
    where
        S: Stream<Item = Result<String>>,
    {
        let start = Instant::now();
        let mut fragments = std::pin::pin!(fragments);
        let mut cancelled = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = fragments.next() => next,
            };
            match next {
                Some(Ok(fragment)) => {
                    self.accumulate(&fragment)?;
                    observer.on_fragment(&fragment, &self.content);
                }
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    tracing::debug!(
                        session = %self.session_id,
                        fragments = self.fragments,
                        error = %err,
                        "stream failed"
                    );
                    return Err(err);
                }
                None => break,
            }
        }

        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        if cancelled {
            STREAM_CANCELLATIONS.click();
            tracing::info!(
                session = %self.session_id,
                fragments = self.fragments,
                "stream cancelled"
            );
        }
        observer.on_finish(&self.content, cancelled);
        Ok(StreamSummary {
            content: self.content,
            fragments: self.fragments,
            cancelled,
        })
    }
}

/// Issue `request` as a streamed completion and accumulate the reply into
/// `session_id`.
///
/// Cancelling before the response arrives abandons the request and leaves the
/// session untouched. Transport and API failures are returned as errors; any
/// fragments applied before a mid-stream failure remain in the session.
pub async fn send_streaming(
    client: &GithubModels,
    store: &SessionStore,
    session_id: SessionId,
    request: &GenerationRequest,
    cancel: &CancellationToken,
    observer: &mut dyn StreamObserver,
) -> Result<StreamSummary> {
    let fragments = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            STREAM_CANCELLATIONS.click();
            tracing::info!(session = %session_id, "request cancelled before response");
            observer.on_finish("", true);
            return Ok(StreamSummary {
                content: String::new(),
                fragments: 0,
                cancelled: true,
            });
        }
        fragments = client.stream(request) => fragments?,
    };
    StreamAccumulator::new(store, session_id)
        .drive(fragments, cancel, observer)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_frames;
    use crate::types::ChatTurn;
    use crate::{ChatRole, Error};
    use bytes::Bytes;
    use futures::stream;
    use std::io;

    fn frames(body: &'static [u8]) -> impl Stream<Item = Result<String>> {
        decode_frames(stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(body))]))
    }

    fn store_with_user_turn() -> (SessionStore, SessionId) {
        let store = SessionStore::in_memory();
        let id = store.selected_id();
        store.append_turn(&id, ChatTurn::user("hello")).unwrap();
        (store, id)
    }

    /// Records every update and cancels the token after a fixed number of fragments.
    struct Recorder {
        seen: Vec<String>,
        cancel_after: Option<(usize, CancellationToken)>,
        finished: Option<bool>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                seen: Vec::new(),
                cancel_after: None,
                finished: None,
            }
        }
    }

    impl StreamObserver for Recorder {
        fn on_fragment(&mut self, _: &str, content: &str) {
            self.seen.push(content.to_string());
            if let Some((n, token)) = &self.cancel_after {
                if self.seen.len() == *n {
                    token.cancel();
                }
            }
        }

        fn on_finish(&mut self, _: &str, cancelled: bool) {
            self.finished = Some(cancelled);
        }
    }

    #[tokio::test]
    async fn accumulates_fragments_into_one_assistant_turn() {
        let (store, id) = store_with_user_turn();
        let mut recorder = Recorder::new();
        let summary = StreamAccumulator::new(&store, id.clone())
            .drive(
                frames(b"{\"delta\":{\"content\":\"hi\"}}\n{\"delta\":{\"content\":\"!\"}}\n[DONE]\n"),
                &CancellationToken::new(),
                &mut recorder,
            )
            .await
            .unwrap();

        assert_eq!(summary.content, "hi!");
        assert_eq!(summary.fragments, 2);
        assert!(!summary.cancelled);
        assert_eq!(recorder.seen, vec!["hi", "hi!"]);
        assert_eq!(recorder.finished, Some(false));

        let session = store.session(&id).unwrap();
        assert_eq!(
            session.turns,
            vec![ChatTurn::user("hello"), ChatTurn::assistant("hi!")]
        );
    }

    #[tokio::test]
    async fn empty_stream_creates_no_turn() {
        let (store, id) = store_with_user_turn();
        let summary = StreamAccumulator::new(&store, id.clone())
            .drive(frames(b"{\"delta\":{}}\n[DONE]\n"), &CancellationToken::new(), &mut ())
            .await
            .unwrap();
        assert_eq!(summary.fragments, 0);
        let session = store.session(&id).unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(session.last_turn().unwrap().role, ChatRole::User);
    }

    #[tokio::test]
    async fn cancel_keeps_exactly_the_processed_fragments() {
        let (store, id) = store_with_user_turn();
        let cancel = CancellationToken::new();
        let mut recorder = Recorder::new();
        recorder.cancel_after = Some((2, cancel.clone()));

        let summary = StreamAccumulator::new(&store, id.clone())
            .drive(
                frames(b"{\"content\":\"a\"}\n{\"content\":\"b\"}\n{\"content\":\"c\"}\n{\"content\":\"d\"}\n"),
                &cancel,
                &mut recorder,
            )
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.content, "ab");
        assert_eq!(recorder.finished, Some(true));
        assert_eq!(
            store.session(&id).unwrap().last_turn(),
            Some(&ChatTurn::assistant("ab"))
        );
    }

    #[tokio::test]
    async fn cancelled_before_first_fragment() {
        let (store, id) = store_with_user_turn();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = StreamAccumulator::new(&store, id.clone())
            .drive(frames(b"{\"content\":\"a\"}\n"), &cancel, &mut ())
            .await
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.fragments, 0);
        assert_eq!(store.session(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_applied_fragments() {
        let (store, id) = store_with_user_turn();
        let parts: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"content\":\"par\"}\n")),
            Ok(Bytes::from_static(b"{\"content\":\"tial\"}\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "gone")),
        ];
        let err = StreamAccumulator::new(&store, id.clone())
            .drive(
                decode_frames(stream::iter(parts)),
                &CancellationToken::new(),
                &mut (),
            )
            .await
            .unwrap_err();
        assert!(err.is_streaming());
        assert_eq!(
            store.session(&id).unwrap().last_turn(),
            Some(&ChatTurn::assistant("partial"))
        );
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let store = SessionStore::in_memory();
        let err = StreamAccumulator::new(&store, SessionId::from("missing"))
            .drive(frames(b"{\"content\":\"a\"}\n"), &CancellationToken::new(), &mut ())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn content_is_identical_for_every_chunking() {
        let body: &[u8] = b"{\"delta\":{\"content\":\"Rust \"}}\n{\"delta\":{\"content\":\"is \"}}\n{\"delta\":{\"content\":\"fun\"}}\n[DONE]\n";
        for size in [1, 2, 3, 7, 16, body.len()] {
            let (store, id) = store_with_user_turn();
            let parts: Vec<std::result::Result<Bytes, io::Error>> = body
                .chunks(size)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            let summary = StreamAccumulator::new(&store, id.clone())
                .drive(
                    decode_frames(stream::iter(parts)),
                    &CancellationToken::new(),
                    &mut (),
                )
                .await
                .unwrap();
            assert_eq!(summary.content, "Rust is fun", "chunk size {size}");
            assert_eq!(
                store.session(&id).unwrap().last_turn(),
                Some(&ChatTurn::assistant("Rust is fun"))
            );
        }
    }
}
