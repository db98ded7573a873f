//! SSE re-framing between the upstream and the client.
//!
//! The upstream byte stream is split into lines, each line goes through a
//! [`StreamTranscoder`], and whatever it emits is written back out as SSE.
//! The loop owns the upstream response; dropping the outbound body (client
//! gone) or cancelling the request token stops reading and releases it.

use std::pin::Pin;

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use fimgate_core::StreamTranscoder;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

type ByteStream<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

/// State threaded through the `unfold` stream.
struct TranscodeState<E> {
    upstream: ByteStream<E>,
    buf: BytesMut,
    transcoder: StreamTranscoder,
    cancel: CancellationToken,
    /// Cancels `cancel` when the outbound body is dropped.
    _guard: DropGuard,
}

/// Build the client-facing SSE response for an open upstream stream.
pub(crate) fn sse_response(
    upstream: reqwest::Response,
    transcoder: StreamTranscoder,
    cancel: CancellationToken,
) -> Response {
    let body = Body::from_stream(transcode_stream(upstream.bytes_stream(), transcoder, cancel));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no") // Disable nginx buffering
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Transcode an upstream SSE byte stream into client SSE bytes.
///
/// Each yielded item holds the events produced by one upstream line. The
/// stream ends after the terminal marker, when the upstream closes, or as
/// soon as `cancel` fires.
pub fn transcode_stream<S, E>(
    upstream: S,
    transcoder: StreamTranscoder,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = TranscodeState {
        upstream: upstream.boxed(),
        buf: BytesMut::new(),
        transcoder,
        _guard: cancel.clone().drop_guard(),
        cancel,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if st.transcoder.is_terminal() {
                return None;
            }

            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                if let Some(out) = push_line(&mut st.transcoder, &line) {
                    return Some((Ok(out), st));
                }
                continue;
            }

            let next = tokio::select! {
                biased;
                () = st.cancel.cancelled() => {
                    debug!("Stream cancelled, releasing upstream connection");
                    return None;
                }
                next = st.upstream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    warn!("Upstream stream error: {e}");
                    st.transcoder.finish();
                    return Some((Err(std::io::Error::other(e)), st));
                }
                None => {
                    // Trailing line without a newline.
                    let rest = st.buf.split();
                    let out = push_line(&mut st.transcoder, &rest);
                    st.transcoder.finish();
                    return out.map(|out| (Ok(out), st));
                }
            }
        }
    })
}

fn push_line(transcoder: &mut StreamTranscoder, line: &[u8]) -> Option<Bytes> {
    let line = String::from_utf8_lossy(line);
    let events = transcoder.push_line(&line);
    if events.is_empty() {
        return None;
    }
    let out: String = events.iter().map(fimgate_core::OutboundEvent::to_sse).collect();
    Some(Bytes::from(out))
}

/// Find the next newline in the buffer, returning the position after it.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Poll;
    use std::time::Duration;

    use fimgate_core::{InboundProtocol, TextCompletion};
    use futures_util::stream;
    use tokio::sync::oneshot;

    fn ok(s: &str) -> Result<Bytes, std::io::Error> {
        Ok(Bytes::from(s.to_string()))
    }

    fn delta(content: &str) -> String {
        let chunk = serde_json::json!({
            "id": "c1",
            "created": 7,
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        });
        format!("data: {chunk}\n\n")
    }

    /// Upstream that yields `items` then stays open, signalling on drop.
    fn open_upstream(
        items: Vec<Result<Bytes, std::io::Error>>,
    ) -> (
        impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
        oneshot::Receiver<()>,
    ) {
        let (tx, rx) = oneshot::channel::<()>();
        let tail = stream::poll_fn(move |_| {
            let _held = &tx;
            Poll::<Option<Result<Bytes, std::io::Error>>>::Pending
        });
        (stream::iter(items).chain(tail), rx)
    }

    async fn collect(s: impl Stream<Item = Result<Bytes, std::io::Error>>) -> String {
        let parts: Vec<_> = s.collect().await;
        parts
            .into_iter()
            .map(|p| String::from_utf8(p.unwrap().to_vec()).unwrap())
            .collect()
    }

    fn completion_texts(sse: &str) -> Vec<String> {
        sse.split("\n\n")
            .filter_map(|e| e.strip_prefix("data: "))
            .filter(|p| *p != "[DONE]")
            .map(|p| serde_json::from_str::<TextCompletion>(p).unwrap().choices[0].text.clone())
            .collect()
    }

    #[tokio::test]
    async fn legacy_stream_trims_and_terminates() {
        let body = format!("{}{}data: [DONE]\n\n", delta("\n\nfoo"), delta("bar"));
        // Split mid-line to exercise buffering.
        let (a, b) = body.split_at(17);
        let upstream = stream::iter(vec![ok(a), ok(b)]);
        let transcoder = StreamTranscoder::new(InboundProtocol::LegacyFim, "unknown-model");

        let out = collect(transcode_stream(upstream, transcoder, CancellationToken::new())).await;

        assert_eq!(completion_texts(&out), vec!["foo", "bar"]);
        assert!(out.ends_with("data: [DONE]\n\n"));
        assert!(out.contains("\"model\":\"unknown-model\""));
    }

    #[tokio::test]
    async fn chat_stream_passes_lines_through() {
        let body = format!(": ping\n{}data: {{broken\n\ndata: [DONE]\n\n", delta("hi"));
        let upstream = stream::iter(vec![ok(&body)]);
        let transcoder = StreamTranscoder::new(InboundProtocol::Chat, "unknown-model");

        let out = collect(transcode_stream(upstream, transcoder, CancellationToken::new())).await;

        let events: Vec<_> = out.split("\n\n").filter(|e| !e.is_empty()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], "data: [DONE]");

        let chunk: serde_json::Value =
            serde_json::from_str(events[0].strip_prefix("data: ").unwrap()).unwrap();
        assert_eq!(chunk["model"], "unknown-model");
        assert_eq!(chunk["id"], "c1");
        assert_eq!(chunk["choices"][0]["delta"]["content"], "hi");
    }

    #[tokio::test]
    async fn upstream_close_without_done_ends_stream() {
        let body = delta("x");
        let trimmed = body.trim_end();
        let upstream = stream::iter(vec![ok(trimmed)]);
        let transcoder = StreamTranscoder::new(InboundProtocol::LegacyFim, "m");

        let out = collect(transcode_stream(upstream, transcoder, CancellationToken::new())).await;

        assert_eq!(completion_texts(&out), vec!["x"]);
        assert!(!out.contains("[DONE]"));
    }

    #[tokio::test]
    async fn upstream_error_is_surfaced_once() {
        let upstream = stream::iter(vec![
            ok(&delta("a")),
            Err(std::io::Error::other("reset")),
            ok(&delta("never")),
        ]);
        let transcoder = StreamTranscoder::new(InboundProtocol::LegacyFim, "m");
        let items: Vec<_> = transcode_stream(upstream, transcoder, CancellationToken::new())
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn cancellation_stops_reading_and_releases_upstream() {
        let (upstream, released) = open_upstream(vec![ok(&delta("a"))]);
        let cancel = CancellationToken::new();
        let transcoder = StreamTranscoder::new(InboundProtocol::LegacyFim, "m");
        let mut out = Box::pin(transcode_stream(upstream, transcoder, cancel.clone()));

        assert!(out.next().await.unwrap().is_ok());
        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(1), out.next()).await;
        assert!(matches!(next, Ok(None)));

        let dropped = tokio::time::timeout(Duration::from_secs(1), released).await;
        assert!(dropped.is_ok(), "upstream was not released");
    }

    #[tokio::test]
    async fn dropping_output_cancels_token() {
        let (upstream, released) = open_upstream(vec![ok(&delta("a"))]);
        let cancel = CancellationToken::new();
        let transcoder = StreamTranscoder::new(InboundProtocol::Chat, "m");
        let mut out = Box::pin(transcode_stream(upstream, transcoder, cancel.clone()));

        assert!(out.next().await.unwrap().is_ok());
        drop(out);

        assert!(cancel.is_cancelled());
        let dropped = tokio::time::timeout(Duration::from_secs(1), released).await;
        assert!(dropped.is_ok(), "upstream was not released");
    }
}
