use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::events::DomainEvent;

use crate::{EventEnvelope, NackOutcome, NotificationError};

const PENDING_KEY: &str = "appointment_events:pending";
const PROCESSING_KEY: &str = "appointment_events:processing";
const DEAD_LETTER_KEY: &str = "appointment_events:dead";

fn envelope_key(event_id: &str) -> String {
    format!("appointment_event:{}", event_id)
}

/// Durable publish interface for domain events. Mutating services publish
/// through this; delivery failure is theirs to log, never to propagate.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<Uuid, NotificationError>;
}

/// Redis-backed event bus with at-least-once delivery.
///
/// Published envelopes sit on a pending list; a consumer moves an id to its
/// processing list while it works (BRPOPLPUSH), acks by removing it, and
/// nacks by pushing it back with an incremented attempt counter. Envelopes
/// that exhaust their attempts land on the dead-letter list.
pub struct RedisEventBus {
    pool: Pool,
    max_attempts: u32,
}

impl RedisEventBus {
    pub async fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| NotificationError::BusError(format!("Failed to create Redis pool: {}", e)))?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| NotificationError::BusError(format!("Failed to connect to Redis: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Event bus initialized successfully");

        Ok(Self {
            pool,
            max_attempts: config.max_delivery_attempts,
        })
    }

    async fn get_connection(&self) -> Result<Connection, NotificationError> {
        self.pool
            .get()
            .await
            .map_err(|e| NotificationError::BusError(format!("Failed to get Redis connection: {}", e)))
    }

    /// Blocking pop of the next envelope, or `None` after the poll timeout.
    /// The envelope stays on the processing list until acked or nacked.
    pub async fn pull(&self) -> Result<Option<EventEnvelope>, NotificationError> {
        let mut conn = self.get_connection().await?;

        let event_id: Option<String> = conn.brpoplpush(PENDING_KEY, PROCESSING_KEY, 1.0).await?;

        if let Some(id) = event_id {
            let data: Option<String> = conn.hget(&envelope_key(&id), "data").await?;

            match data {
                Some(data) => {
                    let envelope: EventEnvelope = serde_json::from_str(&data)?;
                    debug!("Pulled event {} (attempt {})", id, envelope.attempts + 1);
                    return Ok(Some(envelope));
                }
                None => {
                    // Envelope hash expired out from under its queue entry.
                    warn!("Dropping orphaned event id {}", id);
                    let _: () = conn.lrem(PROCESSING_KEY, 1, &id).await?;
                }
            }
        }

        Ok(None)
    }

    /// Confirm delivery: the envelope leaves the processing list and its
    /// hash is deleted.
    pub async fn ack(&self, envelope: &EventEnvelope) -> Result<(), NotificationError> {
        let mut conn = self.get_connection().await?;
        let id = envelope.event_id.to_string();

        let _: () = conn.lrem(PROCESSING_KEY, 1, &id).await?;
        let _: () = conn.del(envelope_key(&id)).await?;

        debug!("Event {} acked", id);
        Ok(())
    }

    /// Report failed delivery: requeue for another attempt, or park on the
    /// dead-letter list once `max_attempts` is reached.
    pub async fn nack(&self, envelope: &EventEnvelope) -> Result<NackOutcome, NotificationError> {
        let mut updated = envelope.clone();
        updated.attempts += 1;

        let mut conn = self.get_connection().await?;
        let id = updated.event_id.to_string();
        let data = serde_json::to_string(&updated)?;

        let _: () = conn.hset(&envelope_key(&id), "data", data).await?;
        let _: () = conn.lrem(PROCESSING_KEY, 1, &id).await?;

        if updated.attempts >= self.max_attempts {
            let _: () = conn.lpush(DEAD_LETTER_KEY, &id).await?;
            warn!(
                "Event {} exhausted {} delivery attempts, moved to dead-letter list",
                id, self.max_attempts
            );
            Ok(NackOutcome::DeadLettered)
        } else {
            let _: () = conn.lpush(PENDING_KEY, &id).await?;
            debug!(
                "Event {} requeued for redelivery (attempt {}/{})",
                id, updated.attempts, self.max_attempts
            );
            Ok(NackOutcome::Requeued {
                attempts: updated.attempts,
            })
        }
    }

    /// Move in-flight envelopes back to pending. Run once at startup so
    /// deliveries interrupted by a crash are picked up again.
    pub async fn recover_processing(&self) -> Result<u64, NotificationError> {
        let mut conn = self.get_connection().await?;
        let mut recovered = 0;

        loop {
            let id: Option<String> = conn.rpoplpush(PROCESSING_KEY, PENDING_KEY).await?;
            match id {
                Some(_) => recovered += 1,
                None => break,
            }
        }

        if recovered > 0 {
            info!("Recovered {} in-flight events for redelivery", recovered);
        }
        Ok(recovered)
    }

    /// Delay before the given redelivery attempt. Doubles per attempt,
    /// capped so a stubborn failure cannot stall a worker for minutes.
    pub fn retry_backoff(attempts: u32) -> Duration {
        let exp = attempts.saturating_sub(1).min(6);
        let millis = 500u64 * (1u64 << exp);
        Duration::from_millis(millis.min(30_000))
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<Uuid, NotificationError> {
        let envelope = EventEnvelope::new(event.clone());
        let mut conn = self.get_connection().await?;

        let id = envelope.event_id.to_string();
        let data = serde_json::to_string(&envelope)?;

        let _: () = conn
            .hset_multiple(
                &envelope_key(&id),
                &[
                    ("data", data.as_str()),
                    ("event_type", &event.event_type.to_string()),
                    ("enqueued_at", &envelope.enqueued_at.to_rfc3339()),
                ],
            )
            .await?;
        // Envelope hashes expire after 7 days; anything older has either
        // been delivered or dead-lettered long since.
        let _: () = conn.expire(&envelope_key(&id), 604800).await?;
        let _: () = conn.lpush(PENDING_KEY, &id).await?;

        debug!("Published {} event {}", event.event_type, id);
        Ok(envelope.event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(RedisEventBus::retry_backoff(1), Duration::from_millis(500));
        assert_eq!(RedisEventBus::retry_backoff(2), Duration::from_millis(1000));
        assert_eq!(RedisEventBus::retry_backoff(3), Duration::from_millis(2000));
        // Far past the cap exponent: stays bounded.
        assert_eq!(RedisEventBus::retry_backoff(40), Duration::from_millis(30_000));
    }

    #[test]
    fn envelope_round_trips_through_json() {
        use chrono::{NaiveDate, NaiveTime};
        use shared_models::events::{DomainEvent, DomainEventType};

        let envelope = EventEnvelope::new(DomainEvent {
            event_type: DomainEventType::AppointmentBooked,
            appointment_id: 7,
            patient_id: "uid-1".to_string(),
            patient_email: "patient@example.com".to_string(),
            patient_phone: Some("+35312345678".to_string()),
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            service_type: "checkup".to_string(),
            notes: Some("first visit".to_string()),
        });

        let data = serde_json::to_string(&envelope).unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&data).unwrap();

        assert_eq!(parsed.event_id, envelope.event_id);
        assert_eq!(parsed.attempts, 0);
        assert_eq!(parsed.event.appointment_id, 7);
    }
}
