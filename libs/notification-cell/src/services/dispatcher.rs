use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_models::events::DomainEvent;

use crate::services::templates;
use crate::{EventEnvelope, MailSink, NackOutcome, NotificationError, PushSink, RedisEventBus};

// The bus may redeliver; remembering this many recent channel deliveries is
// enough to absorb redelivery bursts without growing unbounded.
const LEDGER_CAPACITY: usize = 1024;

struct DeliveryLedger {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl DeliveryLedger {
    fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    fn record(&mut self, key: String) {
        if self.seen.insert(key.clone()) {
            self.order.push_back(key);
            if self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.seen.remove(&evicted);
                }
            }
        }
    }
}

/// Renders an event and drives both delivery channels.
///
/// Channels fail independently: a push fault never blocks the email and vice
/// versa. Any channel failure fails the delivery as a whole so the bus
/// redelivers; per-channel idempotency keys keep the re-run from repeating
/// sends that already succeeded.
pub struct DeliveryPipeline {
    mail: Arc<dyn MailSink>,
    push: Arc<dyn PushSink>,
    ledger: RwLock<DeliveryLedger>,
}

impl DeliveryPipeline {
    pub fn new(mail: Arc<dyn MailSink>, push: Arc<dyn PushSink>) -> Self {
        Self {
            mail,
            push,
            ledger: RwLock::new(DeliveryLedger::new(LEDGER_CAPACITY)),
        }
    }

    async fn already_delivered(&self, key: &str) -> bool {
        self.ledger.read().await.contains(key)
    }

    async fn mark_delivered(&self, key: String) {
        self.ledger.write().await.record(key);
    }

    pub async fn deliver(&self, event: &DomainEvent) -> Result<(), NotificationError> {
        let Some(rendered) = templates::render(event) else {
            debug!(
                "Unhandled event type for appointment {}, dropping",
                event.appointment_id
            );
            return Ok(());
        };

        debug!(
            "Rendered {} notification for appointment {}",
            event.event_type, event.appointment_id
        );

        let mut failures: Vec<String> = Vec::new();

        if event.patient_email.is_empty() {
            debug!("Skipping email: no recipient address on event");
        } else {
            let mail_key = format!("{}:email", event.idempotency_key());
            if self.already_delivered(&mail_key).await {
                info!(
                    "Duplicate delivery of {}, email already sent",
                    event.idempotency_key()
                );
            } else {
                match self
                    .mail
                    .send(&event.patient_email, &rendered.subject, &rendered.html_body)
                    .await
                {
                    Ok(()) => self.mark_delivered(mail_key).await,
                    Err(e) => {
                        error!(
                            "Email delivery failed for appointment {}: {}",
                            event.appointment_id, e
                        );
                        failures.push(format!("email: {e}"));
                    }
                }
            }
        }

        if event.patient_phone.is_some() {
            let push_key = format!("{}:push", event.idempotency_key());
            if self.already_delivered(&push_key).await {
                info!(
                    "Duplicate delivery of {}, push already sent",
                    event.idempotency_key()
                );
            } else {
                let target = format!("user_{}", event.patient_id);
                match self
                    .push
                    .send(
                        &target,
                        &rendered.push_title,
                        &rendered.push_body,
                        &event.event_type,
                    )
                    .await
                {
                    Ok(()) => self.mark_delivered(push_key).await,
                    Err(e) => {
                        error!(
                            "Push delivery failed for appointment {}: {}",
                            event.appointment_id, e
                        );
                        failures.push(format!("push: {e}"));
                    }
                }
            }
        } else {
            debug!("Skipping push: no patient phone on event");
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::DeliveryError(failures.join("; ")))
        }
    }
}

/// Bus consumer: pulls envelopes, runs them through the pipeline, and acks
/// or nacks so the at-least-once contract holds.
pub struct NotificationDispatcher {
    bus: Arc<RedisEventBus>,
    pipeline: Arc<DeliveryPipeline>,
    workers: usize,
    is_shutdown: RwLock<bool>,
}

impl NotificationDispatcher {
    pub fn new(bus: Arc<RedisEventBus>, pipeline: Arc<DeliveryPipeline>, config: &AppConfig) -> Self {
        Self {
            bus,
            pipeline,
            workers: config.dispatcher_workers,
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn start(self: Arc<Self>) -> Result<(), NotificationError> {
        info!(
            "Starting notification dispatcher with {} workers",
            self.workers
        );

        // Deliveries interrupted by a previous crash go back on the queue.
        self.bus.recover_processing().await?;

        let mut handles = Vec::new();

        for i in 0..self.workers {
            let dispatcher = Arc::clone(&self);
            let worker_name = format!("dispatcher-{}", i);

            handles.push(tokio::spawn(async move {
                dispatcher.worker_loop(worker_name).await
            }));
        }

        futures::future::try_join_all(handles)
            .await
            .map_err(|e| NotificationError::BusError(format!("Worker task failed: {e}")))?;

        Ok(())
    }

    pub async fn shutdown(&self) {
        info!("Initiating notification dispatcher shutdown");
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    async fn worker_loop(&self, worker_name: String) {
        debug!("Worker loop started: {}", worker_name);

        loop {
            if *self.is_shutdown.read().await {
                debug!("Worker {} received shutdown signal", worker_name);
                break;
            }

            match self.bus.pull().await {
                Ok(Some(envelope)) => self.handle_envelope(envelope, &worker_name).await,
                Ok(None) => {
                    // pull() already blocked for its poll timeout.
                }
                Err(e) => {
                    error!("Worker {} failed to pull event: {}", worker_name, e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }

        debug!("Worker loop ended: {}", worker_name);
    }

    async fn handle_envelope(&self, envelope: EventEnvelope, worker_name: &str) {
        match self.pipeline.deliver(&envelope.event).await {
            Ok(()) => {
                if let Err(e) = self.bus.ack(&envelope).await {
                    error!("Failed to ack event {}: {}", envelope.event_id, e);
                }
            }
            Err(e) => {
                warn!(
                    "Worker {} delivery failed for event {}: {}",
                    worker_name, envelope.event_id, e
                );
                match self.bus.nack(&envelope).await {
                    Ok(NackOutcome::Requeued { attempts }) => {
                        tokio::time::sleep(RedisEventBus::retry_backoff(attempts)).await;
                    }
                    Ok(NackOutcome::DeadLettered) => {}
                    Err(nack_err) => {
                        error!("Failed to nack event {}: {}", envelope.event_id, nack_err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_evicts_oldest_once_full() {
        let mut ledger = DeliveryLedger::new(2);
        ledger.record("a".to_string());
        ledger.record("b".to_string());
        ledger.record("c".to_string());

        assert!(!ledger.contains("a"));
        assert!(ledger.contains("b"));
        assert!(ledger.contains("c"));
    }

    #[test]
    fn ledger_ignores_repeat_records() {
        let mut ledger = DeliveryLedger::new(2);
        ledger.record("a".to_string());
        ledger.record("a".to_string());
        ledger.record("b".to_string());

        assert!(ledger.contains("a"));
        assert!(ledger.contains("b"));
    }
}
