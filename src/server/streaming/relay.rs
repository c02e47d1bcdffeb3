//! Streaming relay.
//!
//! One upstream completion call runs in its own task while the relay emits
//! keep-alive heartbeats on a fixed cadence. Once the call resolves, the reply
//! is cut into fixed-size chunks and emitted with a small delay between them.
//! Every sequence ends with exactly one `Done` or `Error`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, stream};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::config::{RelayConfig, UpstreamConfig};
use crate::error::RelayError;
use crate::providers::{Completion, CompletionBackend};

/// One element of the relay's output, in production order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Heartbeat,
    Chunk(String),
    Done,
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// A validated inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub deployment_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelayTiming {
    pub heartbeat_interval: Duration,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub upstream_timeout: Duration,
}

impl From<&RelayConfig> for RelayTiming {
    fn from(cfg: &RelayConfig) -> Self {
        Self {
            heartbeat_interval: cfg.heartbeat_interval(),
            chunk_size: cfg.chunk_size.max(1),
            chunk_delay: cfg.chunk_delay(),
            upstream_timeout: cfg.stream_timeout(),
        }
    }
}

/// Splits `text` into consecutive pieces of at most `size` characters.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Aborts the wrapped task when dropped, so a consumer that goes away
/// takes the in-flight upstream call with it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum RelayState {
    Failed(RelayError),
    Waiting {
        upstream: AbortOnDrop<Result<Completion, RelayError>>,
        ticker: Interval,
        heartbeats: u64,
    },
    Emitting {
        chunks: std::vec::IntoIter<String>,
        emitted: usize,
    },
    Finished,
}

struct Relay {
    id: Uuid,
    state: RelayState,
    chunk_size: usize,
    chunk_delay: Duration,
}

/// Starts the upstream call and returns the event sequence for one request.
///
/// Deployment and endpoint problems are reported as a single `Error` before any
/// heartbeat. Dropping the returned stream aborts the upstream call.
pub fn relay(
    backend: Arc<dyn CompletionBackend>,
    upstream: &UpstreamConfig,
    request: ChatRequest,
    timing: RelayTiming,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    let id = Uuid::new_v4();
    let preview: String = request.message.chars().take(50).collect();
    tracing::info!(request_id = %id, "Processing chat message: {}...", preview);

    let state = match start_upstream(backend, upstream, request, &timing) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(request_id = %id, "Relay rejected before upstream call: {}", e);
            RelayState::Failed(e)
        }
    };

    let relay = Relay {
        id,
        state,
        chunk_size: timing.chunk_size,
        chunk_delay: timing.chunk_delay,
    };
    stream::unfold(relay, step)
}

fn start_upstream(
    backend: Arc<dyn CompletionBackend>,
    upstream: &UpstreamConfig,
    request: ChatRequest,
    timing: &RelayTiming,
) -> Result<RelayState, RelayError> {
    let deployment_id = upstream
        .resolve_deployment_id(request.deployment_id.as_deref())
        .ok_or_else(|| RelayError::Config("Deployment ID is required".into()))?;
    // surfaces a missing endpoint before the task starts
    upstream.completion_url(&deployment_id)?;
    tracing::info!("Using deployment_id: {}", deployment_id);

    let message = request.message;
    let timeout = timing.upstream_timeout;
    let handle = tokio::spawn(async move {
        backend.complete(&message, &deployment_id, timeout).await
    });

    let period = timing.heartbeat_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    Ok(RelayState::Waiting {
        upstream: AbortOnDrop(handle),
        ticker,
        heartbeats: 0,
    })
}

async fn step(mut relay: Relay) -> Option<(StreamEvent, Relay)> {
    loop {
        match std::mem::replace(&mut relay.state, RelayState::Finished) {
            RelayState::Finished => return None,
            RelayState::Failed(e) => {
                return Some((StreamEvent::Error(e.to_string()), relay));
            }
            RelayState::Waiting {
                mut upstream,
                mut ticker,
                heartbeats,
            } => {
                tokio::select! {
                    biased;
                    joined = &mut upstream => {
                        let outcome = joined
                            .unwrap_or_else(|e| Err(RelayError::Unexpected(e.to_string())));
                        match outcome {
                            Ok(completion) => {
                                let chunks = chunk_text(&completion.text, relay.chunk_size);
                                tracing::info!(
                                    request_id = %relay.id,
                                    "Upstream answered after {} heartbeats; streaming {} chunks",
                                    heartbeats,
                                    chunks.len()
                                );
                                relay.state = RelayState::Emitting {
                                    chunks: chunks.into_iter(),
                                    emitted: 0,
                                };
                            }
                            Err(e) => {
                                tracing::error!(request_id = %relay.id, "Upstream call failed: {}", e);
                                return Some((StreamEvent::Error(e.to_string()), relay));
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        let heartbeats = heartbeats + 1;
                        tracing::debug!(request_id = %relay.id, "Sending heartbeat #{}", heartbeats);
                        relay.state = RelayState::Waiting { upstream, ticker, heartbeats };
                        return Some((StreamEvent::Heartbeat, relay));
                    }
                }
            }
            RelayState::Emitting { mut chunks, emitted } => {
                if emitted > 0 && !relay.chunk_delay.is_zero() {
                    tokio::time::sleep(relay.chunk_delay).await;
                }
                return match chunks.next() {
                    Some(chunk) => {
                        tracing::debug!(request_id = %relay.id, "Streamed chunk {}", emitted + 1);
                        relay.state = RelayState::Emitting {
                            chunks,
                            emitted: emitted + 1,
                        };
                        Some((StreamEvent::Chunk(chunk), relay))
                    }
                    None => {
                        tracing::info!(
                            request_id = %relay.id,
                            "Chat streaming completed (total chunks: {})",
                            emitted
                        );
                        Some((StreamEvent::Done, relay))
                    }
                };
            }
        }
    }
}
