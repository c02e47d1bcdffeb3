//! SSE framing for relay events.

use std::convert::Infallible;

use axum::http::{HeaderName, HeaderValue, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use super::relay::StreamEvent;

const HEARTBEAT_COMMENT: &str = "heartbeat";
const DONE_MARKER: &str = "[DONE]";

// Matches the `{"key": "value"}` spacing existing browser clients were written against.
fn json_field(key: &str, value: &str) -> String {
    format!("{{\"{}\": {}}}", key, Value::String(value.to_string()))
}

pub fn to_sse_event(event: &StreamEvent) -> Event {
    match event {
        StreamEvent::Heartbeat => Event::default().comment(HEARTBEAT_COMMENT),
        StreamEvent::Chunk(text) => Event::default().data(json_field("content", text)),
        StreamEvent::Done => Event::default().data(DONE_MARKER),
        StreamEvent::Error(message) => Event::default().data(json_field("error", message)),
    }
}

/// Wraps a relay sequence in a `text/event-stream` response. Each event is
/// written as its own body frame, so heartbeats reach the peer on time.
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    let frames = events.map(|ev| Ok::<_, Infallible>(to_sse_event(&ev)));
    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        Sse::new(frames),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    async fn wire(events: Vec<StreamEvent>) -> (Response<()>, String) {
        let res = sse_response(stream::iter(events));
        let (parts, body) = res.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (
            Response::from_parts(parts, ()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    #[tokio::test]
    async fn frames_every_event_kind() {
        let (_, body) = wire(vec![
            StreamEvent::Heartbeat,
            StreamEvent::Chunk("Hi there".into()),
            StreamEvent::Done,
        ])
        .await;
        assert_eq!(
            body,
            ": heartbeat\n\ndata: {\"content\": \"Hi there\"}\n\ndata: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn error_frame_is_json() {
        let (_, body) = wire(vec![StreamEvent::Error("No response from agent".into())]).await;
        assert_eq!(body, "data: {\"error\": \"No response from agent\"}\n\n");
    }

    #[tokio::test]
    async fn chunk_text_is_json_escaped() {
        let (_, body) = wire(vec![StreamEvent::Chunk("line1\n\"quoted\"".into())]).await;
        assert_eq!(
            body,
            "data: {\"content\": \"line1\\n\\\"quoted\\\"\"}\n\n"
        );
        let payload = body.trim_start_matches("data: ").trim_end();
        let v: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(v["content"], "line1\n\"quoted\"");
    }

    #[tokio::test]
    async fn sets_streaming_headers() {
        let (res, _) = wire(vec![StreamEvent::Done]).await;
        let headers = res.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
    }
}
