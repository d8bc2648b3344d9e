//! Server-Sent Events framing for JSON-RPC responses.
//!
//! An MCP server may answer a POST with `text/event-stream` instead of a
//! plain JSON body. Each event carries one JSON document split over one or
//! more `data:` lines; the first event that parses as a JSON-RPC response
//! settles the request.

use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::McpError;
use crate::protocol::JsonRpcResponse;

/// Incremental SSE decoder.
///
/// Bytes are buffered until a full line is available so multi-byte UTF-8
/// sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the data payloads of every event completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush at end of stream. Returns the data collected for an event whose
    /// terminating blank line never arrived.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data))
        }
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data.push_str(value.trim());
        }
        // event:, id:, retry: and comments carry nothing we need
        None
    }
}

/// Read an event stream until the first JSON-RPC response.
///
/// Events that are not valid JSON, or that are notifications rather than
/// responses, are skipped. The whole read is bounded by `timeout`.
pub async fn read_response<S, B, E>(
    stream: S,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<JsonRpcResponse, McpError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(McpError::Cancelled),
        outcome = tokio::time::timeout(timeout, read_until_response(stream)) => {
            outcome.unwrap_or(Err(McpError::SseTimeout(timeout)))
        }
    }
}

async fn read_until_response<S, B, E>(stream: S) -> Result<JsonRpcResponse, McpError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| McpError::transport(format!("error reading SSE stream: {}", e)))?;
        for data in decoder.push(chunk.as_ref()) {
            if let Some(response) = try_parse(&data) {
                return Ok(response);
            }
        }
    }

    if let Some(data) = decoder.finish()
        && let Some(response) = try_parse(&data)
    {
        return Ok(response);
    }
    Err(McpError::SseIncomplete)
}

fn try_parse(data: &str) -> Option<JsonRpcResponse> {
    match JsonRpcResponse::parse(data) {
        Ok(Some(response)) => Some(response),
        Ok(None) => {
            debug!("Skipping non-response SSE event");
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse SSE event data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;
    use std::convert::Infallible;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(p.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: message\ndata: {\"a\":\ndata: 1}\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn decoder_handles_crlf_and_split_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: hel").is_empty());
        assert!(decoder.push(b"lo\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn decoder_keeps_utf8_split_across_chunks() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.len() - 3;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&text[..split]).is_empty());
        assert_eq!(decoder.push(&text[split..]), vec!["caf\u{e9}".to_string()]);
    }

    #[test]
    fn finish_returns_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"x\":1}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("{\"x\":1}"));
        assert!(decoder.finish().is_none());
    }

    #[tokio::test]
    async fn first_response_wins() {
        let stream = chunks(&[
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n",
            "data: not json\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"n\":1}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"n\":2}}\n\n",
        ]);
        let response = read_response(stream, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.into_result().unwrap(), json!({"n": 1}));
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line() {
        let stream = chunks(&["data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}"]);
        let response = read_response(stream, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.into_result().unwrap(), json!({}));
    }

    #[tokio::test]
    async fn ending_without_response_is_an_error() {
        let stream = chunks(&["event: ping\n\n", ": keepalive\n"]);
        let err = read_response(stream, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "SSE stream ended without complete message");
    }

    #[tokio::test]
    async fn stalled_stream_times_out() {
        let stream = stream::pending::<Result<Vec<u8>, Infallible>>();
        let err = read_response(stream, Duration::from_millis(50), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::SseTimeout(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_reading() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stream = stream::pending::<Result<Vec<u8>, Infallible>>();
        let err = read_response(stream, Duration::from_secs(60), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Cancelled));
    }
}
