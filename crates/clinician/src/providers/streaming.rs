//! Incremental decoding of SSE-style provider streams.
//!
//! The decoder owns the byte source (and with it the open connection) for
//! its whole life. The source is released exactly once: when the terminator
//! or end of input is reached, when a read fails, or when the consumer drops
//! the stream early.

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::errors::{ProviderError, ProviderResult};

/// Lazy sequence of answer fragments.
pub type TextStream = BoxStream<'static, ProviderResult<String>>;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Where fragment text lives inside one decoded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPath {
    /// `choices[].delta.content`
    ChatDelta,
    /// First string at `/response/delta`, `/delta`, `/delta/text` or `/text`.
    AgentDelta,
}

impl FragmentPath {
    pub fn fragments(&self, event: &Value) -> Vec<String> {
        match self {
            FragmentPath::ChatDelta => event
                .get("choices")
                .and_then(Value::as_array)
                .map(|choices| {
                    choices
                        .iter()
                        .filter_map(|choice| choice.get("delta")?.get("content")?.as_str())
                        .filter(|content| !content.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            FragmentPath::AgentDelta => ["/response/delta", "/delta", "/delta/text", "/text"]
                .iter()
                .filter_map(|pointer| event.pointer(pointer)?.as_str())
                .find(|text| !text.is_empty())
                .map(|text| vec![text.to_string()])
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Skip,
    Done,
    Event(Value),
}

fn parse_line(raw: &str) -> SseLine {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }

    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim();
    if payload == DONE_SENTINEL {
        return SseLine::Done;
    }

    match serde_json::from_str(payload) {
        Ok(event) => SseLine::Event(event),
        Err(err) => {
            warn!("Skipping non-JSON stream line: {err}");
            SseLine::Skip
        }
    }
}

/// Holds the byte source until it is released.
struct ConnectionLease<S> {
    provider: &'static str,
    source: Option<Pin<Box<S>>>,
}

impl<S> ConnectionLease<S> {
    fn new(provider: &'static str, source: S) -> Self {
        Self {
            provider,
            source: Some(Box::pin(source)),
        }
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            debug!(provider = self.provider, "Released stream connection");
        }
    }
}

impl<S> Drop for ConnectionLease<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Decode a byte stream into answer fragments.
pub fn decode<S, E>(provider: &'static str, source: S, path: FragmentPath) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut lease = ConnectionLease::new(provider, source);
        let mut buffer: Vec<u8> = Vec::new();
        let mut done = false;
        let mut failure = None;

        while !done {
            let next = match lease.source.as_mut() {
                Some(source) => source.next().await,
                None => None,
            };
            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => {
                    failure = Some(ProviderError::Stream {
                        provider,
                        detail: err.to_string(),
                    });
                    break;
                }
                None => break,
            };

            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_line(&String::from_utf8_lossy(&line)) {
                    SseLine::Skip => {}
                    SseLine::Done => {
                        done = true;
                        break;
                    }
                    SseLine::Event(event) => {
                        for fragment in path.fragments(&event) {
                            yield Ok(fragment);
                        }
                    }
                }
            }
        }

        // A final event may arrive without a trailing newline.
        if !done && failure.is_none() && !buffer.is_empty() {
            if let SseLine::Event(event) = parse_line(&String::from_utf8_lossy(&buffer)) {
                for fragment in path.fragments(&event) {
                    yield Ok(fragment);
                }
            }
        }

        lease.release();
        if let Some(err) = failure {
            yield Err(err);
        }
    };

    Box::pin(stream)
}

/// Decode a live provider response, taking ownership of its connection.
pub fn decode_response(
    provider: &'static str,
    response: reqwest::Response,
    path: FragmentPath,
) -> TextStream {
    decode(provider, response.bytes_stream(), path)
}

/// Drain a fragment stream into one string.
pub async fn collect_text(mut stream: TextStream) -> ProviderResult<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// Byte source that counts how often it is dropped.
    struct Tracked<S> {
        inner: S,
        drops: Arc<AtomicUsize>,
    }

    impl<S: Stream + Unpin> Stream for Tracked<S> {
        type Item = S::Item;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.inner).poll_next(cx)
        }
    }

    impl<S> Drop for Tracked<S> {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(
        chunks: Vec<Result<&'static str, &'static str>>,
    ) -> (
        Tracked<impl Stream<Item = Result<Bytes, io::Error>> + Unpin>,
        Arc<AtomicUsize>,
    ) {
        let drops = Arc::new(AtomicUsize::new(0));
        let items: Vec<Result<Bytes, io::Error>> = chunks
            .into_iter()
            .map(|chunk| match chunk {
                Ok(text) => Ok(Bytes::from_static(text.as_bytes())),
                Err(msg) => Err(io::Error::new(io::ErrorKind::ConnectionReset, msg)),
            })
            .collect();
        let source = Tracked {
            inner: stream::iter(items),
            drops: drops.clone(),
        };
        (source, drops)
    }

    async fn drain(mut stream: TextStream) -> Vec<ProviderResult<String>> {
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    fn chat_event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[tokio::test]
    async fn test_yields_fragments_in_order() {
        let body = format!("{}{}data: [DONE]\n\n", chat_event("Q1"), chat_event(" and Q2"));
        let source = stream::iter(vec![Ok::<_, io::Error>(Bytes::from(body))]);

        let text = collect_text(decode("OpenAI", source, FragmentPath::ChatDelta))
            .await
            .unwrap();
        assert_eq!(text, "Q1 and Q2");
    }

    #[tokio::test]
    async fn test_events_split_across_chunks() {
        let (source, drops) = tracked(vec![
            Ok("data: {\"choices\": [{\"delta\": {\"con"),
            Ok("tent\": \"Hel\"}}]}\n"),
            Ok("\ndata: {\"choices\": [{\"delta\": {\"content\": \"lo\"}}]}\n\nda"),
            Ok("ta: [DONE]\n\n"),
        ]);

        let items = drain(decode("OpenAI", source, FragmentPath::ChatDelta)).await;
        let fragments: Vec<String> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(fragments, vec!["Hel", "lo"]);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skips_malformed_and_heartbeat_lines() {
        let (source, _) = tracked(vec![
            Ok(": keep-alive\n\n"),
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"one\"}}]}\n\n"),
            Ok("data: {not json}\n\n"),
            Ok("event: ping\n"),
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \" two\"}}]}\n\n"),
            Ok("data: [DONE]\n\n"),
        ]);

        let text = collect_text(decode("OpenAI", source, FragmentPath::ChatDelta))
            .await
            .unwrap();
        assert_eq!(text, "one two");
    }

    #[tokio::test]
    async fn test_stops_at_done_sentinel() {
        let (source, drops) = tracked(vec![
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"kept\"}}]}\n\n"),
            Ok("data: [DONE]\n\n"),
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"ignored\"}}]}\n\n"),
        ]);

        let items = drain(decode("OpenAI", source, FragmentPath::ChatDelta)).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_deref().unwrap(), "kept");
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unterminated_final_line_is_decoded() {
        let (source, drops) = tracked(vec![Ok("{\"delta\": \"tail\"}")]);

        let text = collect_text(decode("You.com", source, FragmentPath::AgentDelta))
            .await
            .unwrap();
        assert_eq!(text, "tail");
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_releases_source_before_end_of_iteration() {
        let (source, drops) = tracked(vec![Ok(
            "data: {\"choices\": [{\"delta\": {\"content\": \"x\"}}]}\n\n",
        )]);

        let mut stream = decode("OpenAI", source, FragmentPath::ChatDelta);
        assert_eq!(stream.next().await.unwrap().unwrap(), "x");
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert!(stream.next().await.is_none());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(stream);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_releases_source_on_early_drop() {
        let (source, drops) = tracked(vec![
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"first\"}}]}\n\n"),
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"second\"}}]}\n\n"),
        ]);

        let mut stream = decode("OpenAI", source, FragmentPath::ChatDelta);
        assert_eq!(stream.next().await.unwrap().unwrap(), "first");
        drop(stream);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_error_ends_stream_after_release() {
        let (source, drops) = tracked(vec![
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"partial\"}}]}\n\n"),
            Err("connection reset by peer"),
            Ok("data: {\"choices\": [{\"delta\": {\"content\": \"never\"}}]}\n\n"),
        ]);

        let items = drain(decode("OpenAI", source, FragmentPath::ChatDelta)).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "partial");
        let err = items[1].as_ref().unwrap_err();
        assert!(matches!(err, ProviderError::Stream { .. }));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_agent_delta_paths() {
        let path = FragmentPath::AgentDelta;
        assert_eq!(
            path.fragments(&json!({"type": "response.output_text.delta", "response": {"delta": "a"}})),
            vec!["a"]
        );
        assert_eq!(path.fragments(&json!({"delta": {"text": "b"}})), vec!["b"]);
        assert_eq!(path.fragments(&json!({"text": "c"})), vec!["c"]);
        assert!(path.fragments(&json!({"type": "response.done"})).is_empty());
    }

    #[test]
    fn test_chat_delta_ignores_empty_and_role_only_chunks() {
        let path = FragmentPath::ChatDelta;
        let event = json!({"choices": [
            {"delta": {"role": "assistant"}},
            {"delta": {"content": ""}},
            {"delta": {"content": "x"}}
        ]});
        assert_eq!(path.fragments(&event), vec!["x"]);
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(""), SseLine::Skip);
        assert_eq!(parse_line(": ping"), SseLine::Skip);
        assert_eq!(parse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_line("data:[DONE]\r"), SseLine::Done);
        assert_eq!(parse_line("data: nope"), SseLine::Skip);
        assert_eq!(parse_line("{\"a\": 1}"), SseLine::Event(json!({"a": 1})));
    }
}
