use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::events::DomainEvent;

/// Bus bookkeeping wrapped around a [`DomainEvent`]. The envelope never
/// leaves the queue layer; producers publish bare events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            attempts: 0,
            enqueued_at: Utc::now(),
            event,
        }
    }
}

/// Rendered notification content for one event, covering both channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub html_body: String,
    pub push_title: String,
    pub push_body: String,
}

/// What the bus did with an envelope that failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackOutcome {
    Requeued { attempts: u32 },
    DeadLettered,
}
