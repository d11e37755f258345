use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_anon_key: String,
    pub auth_jwt_secret: String,
    pub redis_url: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub sender_email: String,
    pub push_gateway_url: Option<String>,
    pub request_timeout_seconds: u64,
    pub max_delivery_attempts: u32,
    pub dispatcher_workers: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            database_anon_key: env::var("DATABASE_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_ANON_KEY not set, using empty value");
                    String::new()
                }),
            auth_jwt_secret: env::var("AUTH_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("AUTH_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok(),
            smtp_host: env::var("SMTP_HOST")
                .unwrap_or_else(|_| {
                    warn!("SMTP_HOST not set, mail delivery disabled");
                    String::new()
                }),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            sender_email: env::var("SENDER_EMAIL").unwrap_or_default(),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            max_delivery_attempts: env::var("MAX_DELIVERY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            dispatcher_workers: env::var("DISPATCHER_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.database_anon_key.is_empty()
            && !self.auth_jwt_secret.is_empty()
    }

    pub fn is_mail_configured(&self) -> bool {
        !self.smtp_host.is_empty()
            && !self.smtp_username.is_empty()
            && !self.smtp_password.is_empty()
            && !self.sender_email.is_empty()
    }
}
