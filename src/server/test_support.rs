use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::oneshot;

use crate::config::{Settings, UpstreamConfig};
use crate::config::settings::FileSettings;
use crate::error::RelayError;
use crate::providers::{Completion, CompletionBackend};

type Outcome = Box<dyn Fn(&str, &str) -> Result<String, RelayError> + Send + Sync>;

/// In-memory stand-in for the completion service.
pub(crate) struct MockBackend {
    delay: Duration,
    outcome: Outcome,
    calls: Arc<AtomicUsize>,
    hang_guard: Mutex<Option<oneshot::Sender<()>>>,
}

impl MockBackend {
    fn new(delay: Duration, outcome: Outcome) -> Self {
        Self {
            delay,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
            hang_guard: Mutex::new(None),
        }
    }

    pub(crate) fn replying(text: &str, delay: Duration) -> Self {
        let text = text.to_string();
        Self::new(delay, Box::new(move |_, _| Ok(text.clone())))
    }

    pub(crate) fn failing(delay: Duration, err: fn() -> RelayError) -> Self {
        Self::new(delay, Box::new(move |_, _| Err(err())))
    }

    /// Replies with the deployment id it was called with.
    pub(crate) fn echo_deployment(delay: Duration) -> Self {
        Self::new(delay, Box::new(|_, deployment| Ok(deployment.to_string())))
    }

    /// Never answers; the receiver resolves once the pending call is dropped.
    pub(crate) fn hanging() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let backend = Self::new(Duration::ZERO, Box::new(|_, _| Ok(String::new())));
        *backend.hang_guard.lock().unwrap() = Some(tx);
        (backend, rx)
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(
        &self,
        message: &str,
        deployment_id: &str,
        _timeout: Duration,
    ) -> Result<Completion, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.hang_guard.lock().unwrap().take();
        if let Some(_guard) = guard {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let text = (self.outcome)(message, deployment_id)?;
        Ok(Completion {
            raw: json!({ "choices": [{ "message": { "content": text.clone() } }] }),
            text,
        })
    }
}

pub(crate) fn settings_with(upstream: UpstreamConfig) -> Settings {
    let mut settings = Settings::from_parts(FileSettings::default(), |_| None);
    settings.upstream = upstream;
    settings
}
