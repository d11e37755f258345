use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Bus operation failed: {0}")]
    BusError(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Mail delivery failed: {0}")]
    MailError(String),

    #[error("Push delivery failed: {0}")]
    PushError(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryError(String),
}
