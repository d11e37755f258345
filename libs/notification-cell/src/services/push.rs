use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_models::events::DomainEventType;

use crate::NotificationError;

/// Push-notification channel. Targets are opaque recipient handles
/// (`user_<patient_id>`); the gateway resolves them to device tokens.
#[async_trait]
pub trait PushSink: Send + Sync {
    async fn send(
        &self,
        to: &str,
        title: &str,
        body: &str,
        event_type: &DomainEventType,
    ) -> Result<(), NotificationError>;
}

/// Push sink that forwards to an HTTP push gateway.
pub struct HttpPushClient {
    client: Client,
    gateway_url: String,
}

impl HttpPushClient {
    pub fn new(gateway_url: &str, config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .expect("failed to construct HTTP client");

        Self {
            client,
            gateway_url: gateway_url.to_string(),
        }
    }
}

#[async_trait]
impl PushSink for HttpPushClient {
    async fn send(
        &self,
        to: &str,
        title: &str,
        body: &str,
        event_type: &DomainEventType,
    ) -> Result<(), NotificationError> {
        let payload = json!({
            "to": to,
            "title": title,
            "body": body,
            "type": event_type.to_string(),
        });

        let response = self
            .client
            .post(&self.gateway_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::PushError(format!("Push gateway unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Push gateway error ({}): {}", status, detail);
            return Err(NotificationError::PushError(format!(
                "Push gateway returned {}",
                status
            )));
        }

        debug!("Push notification sent to {}", to);
        Ok(())
    }
}

/// Stand-in used when no push gateway is configured; logs and succeeds so
/// email delivery is unaffected.
pub struct NoopPush;

#[async_trait]
impl PushSink for NoopPush {
    async fn send(
        &self,
        to: &str,
        title: &str,
        _body: &str,
        event_type: &DomainEventType,
    ) -> Result<(), NotificationError> {
        info!(
            "Push gateway not configured, skipping {} push to {} ({})",
            event_type, to, title
        );
        Ok(())
    }
}
