use std::sync::Arc;

use async_trait::async_trait;
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::Mutex;

use notification_cell::{DeliveryPipeline, MailSink, NotificationError, PushSink};
use shared_models::events::{DomainEvent, DomainEventType};

#[derive(Default)]
struct RecordingMailSink {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MailSink for RecordingMailSink {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .await
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

struct FailingMailSink;

#[async_trait]
impl MailSink for FailingMailSink {
    async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::MailError("relay refused".to_string()))
    }
}

#[derive(Default)]
struct RecordingPushSink {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl PushSink for RecordingPushSink {
    async fn send(
        &self,
        to: &str,
        title: &str,
        _body: &str,
        _event_type: &DomainEventType,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .await
            .push((to.to_string(), title.to_string()));
        Ok(())
    }
}

struct FailingPushSink;

#[async_trait]
impl PushSink for FailingPushSink {
    async fn send(
        &self,
        _to: &str,
        _title: &str,
        _body: &str,
        _event_type: &DomainEventType,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::PushError("gateway down".to_string()))
    }
}

fn booked_event() -> DomainEvent {
    DomainEvent {
        event_type: DomainEventType::AppointmentBooked,
        appointment_id: 41,
        patient_id: "uid-1".to_string(),
        patient_email: "patient@example.com".to_string(),
        patient_phone: Some("+35312345678".to_string()),
        appointment_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        service_type: "checkup".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn delivers_to_both_channels() {
    let mail = Arc::new(RecordingMailSink::default());
    let push = Arc::new(RecordingPushSink::default());
    let pipeline = DeliveryPipeline::new(mail.clone(), push.clone());

    pipeline.deliver(&booked_event()).await.unwrap();

    let sent_mail = mail.sent.lock().await;
    assert_eq!(sent_mail.len(), 1);
    assert_eq!(sent_mail[0].0, "patient@example.com");
    assert!(sent_mail[0].1.starts_with("Appointment Confirmed:"));

    let sent_push = push.sent.lock().await;
    assert_eq!(sent_push.len(), 1);
    assert_eq!(sent_push[0].0, "user_uid-1");
}

#[tokio::test]
async fn duplicate_delivery_sends_one_email() {
    let mail = Arc::new(RecordingMailSink::default());
    let push = Arc::new(RecordingPushSink::default());
    let pipeline = DeliveryPipeline::new(mail.clone(), push.clone());

    let event = booked_event();
    pipeline.deliver(&event).await.unwrap();
    pipeline.deliver(&event).await.unwrap();

    assert_eq!(mail.sent.lock().await.len(), 1);
    assert_eq!(push.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn push_failure_does_not_block_email() {
    let mail = Arc::new(RecordingMailSink::default());
    let pipeline = DeliveryPipeline::new(mail.clone(), Arc::new(FailingPushSink));

    let event = booked_event();
    let result = pipeline.deliver(&event).await;

    // The delivery fails overall (so the bus will redeliver) but the email
    // went out.
    assert_matches!(result, Err(NotificationError::DeliveryError(_)));
    assert_eq!(mail.sent.lock().await.len(), 1);

    // Redelivery retries the failed channel only; the email is not repeated.
    let result = pipeline.deliver(&event).await;
    assert_matches!(result, Err(NotificationError::DeliveryError(_)));
    assert_eq!(mail.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn mail_failure_does_not_block_push() {
    let push = Arc::new(RecordingPushSink::default());
    let pipeline = DeliveryPipeline::new(Arc::new(FailingMailSink), push.clone());

    let result = pipeline.deliver(&booked_event()).await;

    assert_matches!(result, Err(NotificationError::DeliveryError(_)));
    assert_eq!(push.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn event_without_phone_skips_push() {
    let mail = Arc::new(RecordingMailSink::default());
    let push = Arc::new(RecordingPushSink::default());
    let pipeline = DeliveryPipeline::new(mail.clone(), push.clone());

    let mut event = booked_event();
    event.patient_phone = None;

    pipeline.deliver(&event).await.unwrap();

    assert_eq!(mail.sent.lock().await.len(), 1);
    assert!(push.sent.lock().await.is_empty());
}

#[tokio::test]
async fn unknown_event_type_is_a_no_op() {
    let mail = Arc::new(RecordingMailSink::default());
    let push = Arc::new(RecordingPushSink::default());
    let pipeline = DeliveryPipeline::new(mail.clone(), push.clone());

    let mut event = booked_event();
    event.event_type = DomainEventType::Unknown;

    pipeline.deliver(&event).await.unwrap();

    assert!(mail.sent.lock().await.is_empty());
    assert!(push.sent.lock().await.is_empty());
}

#[tokio::test]
async fn cancelled_and_booked_events_are_tracked_separately() {
    let mail = Arc::new(RecordingMailSink::default());
    let push = Arc::new(RecordingPushSink::default());
    let pipeline = DeliveryPipeline::new(mail.clone(), push.clone());

    let booked = booked_event();
    let mut cancelled = booked_event();
    cancelled.event_type = DomainEventType::AppointmentCancelled;

    pipeline.deliver(&booked).await.unwrap();
    pipeline.deliver(&cancelled).await.unwrap();

    let sent_mail = mail.sent.lock().await;
    assert_eq!(sent_mail.len(), 2);
    assert!(sent_mail[1].1.starts_with("Appointment Cancelled:"));
}
