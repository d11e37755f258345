use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::NotificationError;

/// Outbound mail channel. The production implementation talks SMTP; tests
/// substitute recording fakes.
#[async_trait]
pub trait MailSink: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotificationError>;
}

/// SMTP mail sink over an authenticated relay.
#[derive(Clone)]
pub struct SmtpMailer {
    smtp_host: String,
    smtp_port: u16,
    credentials: Credentials,
    sender_email: String,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            smtp_host: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            credentials: Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ),
            sender_email: config.sender_email.clone(),
            timeout: Duration::from_secs(config.request_timeout_seconds),
        }
    }

    /// A fresh transport per send avoids holding relay connections across
    /// the dispatcher's long idle stretches.
    fn build_transport(&self) -> Result<SmtpTransport, NotificationError> {
        Ok(SmtpTransport::relay(&self.smtp_host)
            .map_err(|e| NotificationError::MailError(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl MailSink for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotificationError> {
        let email = Message::builder()
            .from(
                self.sender_email
                    .parse()
                    .map_err(|e| NotificationError::MailError(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| NotificationError::MailError(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| NotificationError::MailError(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| NotificationError::MailError(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| NotificationError::MailError(format!("Email task failed: {e}")))??;

        debug!("Email sent to {}", to);
        Ok(())
    }
}

/// Stand-in used when the SMTP relay is not configured; logs and succeeds
/// so events do not churn through redelivery in mail-less deployments.
pub struct NoopMailer;

#[async_trait]
impl MailSink for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), NotificationError> {
        info!("Mail relay not configured, skipping email to {} ({})", to, subject);
        Ok(())
    }
}
