use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of appointment lifecycle events carried on the bus.
///
/// `Unknown` exists only for the consuming side: a payload published with an
/// unrecognized type deserializes into it and is dropped as a terminal no-op
/// instead of poisoning the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainEventType {
    #[serde(rename = "appointmentBooked")]
    AppointmentBooked,
    #[serde(rename = "appointmentCancelled")]
    AppointmentCancelled,
    #[serde(rename = "appointmentReminder")]
    AppointmentReminder,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for DomainEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainEventType::AppointmentBooked => write!(f, "appointmentBooked"),
            DomainEventType::AppointmentCancelled => write!(f, "appointmentCancelled"),
            DomainEventType::AppointmentReminder => write!(f, "appointmentReminder"),
            DomainEventType::Unknown => write!(f, "unknown"),
        }
    }
}

/// State-change notification emitted after a committed booking or
/// cancellation. Consumed, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    pub event_type: DomainEventType,
    pub appointment_id: i64,
    pub patient_id: String,
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub service_type: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DomainEvent {
    /// Stable key identifying the logical notification this event triggers.
    /// Redeliveries of the same event share the key.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.appointment_id, self.event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_wire_names() {
        let json = serde_json::to_string(&DomainEventType::AppointmentBooked).unwrap();
        assert_eq!(json, "\"appointmentBooked\"");

        let parsed: DomainEventType = serde_json::from_str("\"appointmentCancelled\"").unwrap();
        assert_eq!(parsed, DomainEventType::AppointmentCancelled);
    }

    #[test]
    fn unrecognized_event_type_maps_to_unknown() {
        let parsed: DomainEventType = serde_json::from_str("\"appointmentRescheduled\"").unwrap();
        assert_eq!(parsed, DomainEventType::Unknown);
    }

    #[test]
    fn event_payload_uses_camel_case_keys() {
        let event = DomainEvent {
            event_type: DomainEventType::AppointmentBooked,
            appointment_id: 41,
            patient_id: "uid-1".to_string(),
            patient_email: "patient@example.com".to_string(),
            patient_phone: None,
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            service_type: "checkup".to_string(),
            notes: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["eventType"], "appointmentBooked");
        assert_eq!(value["appointmentId"], 41);
        assert_eq!(value["appointmentDate"], "2024-06-10");
        assert_eq!(event.idempotency_key(), "41:appointmentBooked");
    }
}
