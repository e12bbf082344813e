use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

const PUSH_PATH: &str = "/v2/bot/message/push";

/// Delivers a plain-text message to one chat user.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn push_text(&self, user_id: &str, text: &str) -> AppResult<()>;
}

/// LINE Messaging API push client.
///
/// Rate limiting, server errors, timeouts and connection failures are retried
/// after each delay in `retry_delays`; other failures return at once.
pub struct LineNotifier {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    retry_delays: Vec<Duration>,
}

impl LineNotifier {
    pub fn try_new(base_url: &str, access_token: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|err| AppError::config(format!("初始化 LINE HTTP 客戶端失敗: {err}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), PUSH_PATH),
            access_token,
            retry_delays: vec![Duration::from_millis(500), Duration::from_secs(2)],
        })
    }

    pub fn with_retry_delays(mut self, retry_delays: Vec<Duration>) -> Self {
        self.retry_delays = retry_delays;
        self
    }

    async fn send_once(&self, body: &JsonValue) -> Result<(), (AppError, bool)> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                let retryable = err.is_timeout() || err.is_connect();
                (AppError::from(err), retryable)
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        let detail = response.text().await.unwrap_or_default();
        Err((
            AppError::notification(format!("LINE API 回應 {}: {}", status.as_u16(), detail)),
            retryable,
        ))
    }
}

#[async_trait::async_trait]
impl Notifier for LineNotifier {
    async fn push_text(&self, user_id: &str, text: &str) -> AppResult<()> {
        let body = json!({
            "to": user_id,
            "messages": [{ "type": "text", "text": text }],
        });

        let mut delays = self.retry_delays.iter();
        loop {
            match self.send_once(&body).await {
                Ok(()) => {
                    debug!(target: "app::notify", %user_id, "push delivered");
                    return Ok(());
                }
                Err((error, true)) => match delays.next() {
                    Some(delay) => {
                        warn!(target: "app::notify", %user_id, error = %error, delay_ms = delay.as_millis() as u64, "push failed, retrying");
                        sleep(*delay).await;
                    }
                    None => return Err(error),
                },
                Err((error, false)) => return Err(error),
            }
        }
    }
}

/// Used when no channel token is configured; messages are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn push_text(&self, user_id: &str, text: &str) -> AppResult<()> {
        info!(target: "app::notify", %user_id, chars = text.chars().count(), "notifications disabled, message dropped");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastOutcome {
    pub sent: usize,
    pub failed: usize,
}

pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn push(&self, user_id: &str, text: &str) -> AppResult<()> {
        self.notifier.push_text(user_id, text).await
    }

    /// Sends `text` to every recipient concurrently. A failed push is logged
    /// and counted; it never stops the others.
    pub async fn broadcast(&self, recipients: &[String], text: &str) -> BroadcastOutcome {
        let messages = recipients
            .iter()
            .map(|user_id| (user_id.clone(), text.to_string()))
            .collect();
        self.send_each(messages).await
    }

    /// Sends a distinct message to each recipient; same isolation as [`Self::broadcast`].
    pub async fn send_each(&self, messages: Vec<(String, String)>) -> BroadcastOutcome {
        let mut pending: FuturesUnordered<_> = messages
            .into_iter()
            .map(|(user_id, text)| async move {
                let result = self.notifier.push_text(&user_id, &text).await;
                (user_id, result)
            })
            .collect();

        let mut outcome = BroadcastOutcome::default();
        while let Some((user_id, result)) = pending.next().await {
            match result {
                Ok(()) => outcome.sent += 1,
                Err(err) => {
                    warn!(target: "app::notify", %user_id, error = %err, "push failed");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}
