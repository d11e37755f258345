use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::auth::Principal;

use crate::services::slots::SlotGrid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One reserved (or released) clinic slot. Rows are never deleted; a
/// cancellation flips `status` and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: String,
    pub patient_email: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub service_type: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Insert payload for the conditional create; the datastore generates `id`
/// and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub patient_email: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub service_type: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

// Request bodies arrive with optionally-present fields; each carries a
// validation pass that either yields a fully-populated command or a
// `Validation` error naming everything that is missing or malformed.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub patient_id: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub service_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingCommand {
    pub patient_id: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub service_type: String,
    pub notes: Option<String>,
}

impl BookAppointmentRequest {
    pub fn validate(
        &self,
        principal: &Principal,
        grid: &SlotGrid,
    ) -> Result<BookingCommand, SchedulingError> {
        // The verified token's email wins; the body only fills the gap for
        // providers that issue address-less tokens.
        let patient_email = principal
            .email
            .clone()
            .or_else(|| self.patient_email.clone())
            .unwrap_or_default();

        let date_raw = self.appointment_date.as_deref().unwrap_or("");
        let time_raw = self.appointment_time.as_deref().unwrap_or("");
        let service_type = self.service_type.as_deref().unwrap_or("");

        let mut missing = Vec::new();
        if date_raw.is_empty() {
            missing.push("appointmentDate");
        }
        if time_raw.is_empty() {
            missing.push("appointmentTime");
        }
        if service_type.is_empty() {
            missing.push("serviceType");
        }
        if patient_email.is_empty() {
            missing.push("patientEmail");
        }
        if !missing.is_empty() {
            return Err(SchedulingError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let appointment_date = parse_date(date_raw)?;
        let appointment_time = parse_time(time_raw)?;

        if !grid.contains(appointment_time) {
            return Err(SchedulingError::Validation(
                "appointmentTime is not on the bookable slot grid".to_string(),
            ));
        }

        Ok(BookingCommand {
            patient_id: principal.subject.clone(),
            patient_email,
            patient_phone: self.patient_phone.clone(),
            appointment_date,
            appointment_time,
            service_type: service_type.to_string(),
            notes: self.notes.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentRequest {
    pub appointment_id: Option<i64>,
    pub patient_id: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CancellationCommand {
    pub appointment_id: i64,
    pub patient_id: String,
    pub patient_phone: Option<String>,
}

impl CancelAppointmentRequest {
    pub fn validate(&self, principal: &Principal) -> Result<CancellationCommand, SchedulingError> {
        let appointment_id = self.appointment_id.ok_or_else(|| {
            SchedulingError::Validation("Missing required fields: appointmentId".to_string())
        })?;

        Ok(CancellationCommand {
            appointment_id,
            patient_id: principal.subject.clone(),
            patient_phone: self.patient_phone.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub date: Option<String>,
}

impl AvailabilityRequest {
    pub fn validate(&self) -> Result<NaiveDate, SchedulingError> {
        let date = self.date.as_deref().unwrap_or("");
        if date.is_empty() {
            return Err(SchedulingError::Validation(
                "Missing required fields: date".to_string(),
            ));
        }
        parse_date(date)
    }
}

/// `patientId` here is advisory only; the query is always scoped to the
/// authenticated principal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentsQuery {
    pub patient_id: Option<String>,
}

fn parse_date(value: &str) -> Result<NaiveDate, SchedulingError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        SchedulingError::Validation("Invalid date format. Expected YYYY-MM-DD".to_string())
    })
}

fn parse_time(value: &str) -> Result<NaiveTime, SchedulingError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            SchedulingError::Validation("Invalid time format. Expected HH:MM".to_string())
        })
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot no longer available")]
    SlotTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Datastore error: {0}")]
    Database(String),
}

impl From<shared_database::DbError> for SchedulingError {
    fn from(e: shared_database::DbError) -> Self {
        match e {
            // The partial unique index rejects a second active booking for
            // the same slot; the REST head reports it as a conflict.
            shared_database::DbError::Conflict(_) => SchedulingError::SlotTaken,
            other => SchedulingError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn principal() -> Principal {
        Principal {
            subject: "uid-1".to_string(),
            email: Some("patient@example.com".to_string()),
        }
    }

    fn full_request() -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: Some("uid-1".to_string()),
            appointment_date: Some("2024-06-10".to_string()),
            appointment_time: Some("10:00".to_string()),
            service_type: Some("checkup".to_string()),
            notes: None,
            patient_email: None,
            patient_phone: None,
        }
    }

    #[test]
    fn booking_request_validates_into_command() {
        let command = full_request()
            .validate(&principal(), &SlotGrid::default())
            .unwrap();

        assert_eq!(command.patient_id, "uid-1");
        assert_eq!(command.patient_email, "patient@example.com");
        assert_eq!(command.appointment_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn booking_request_lists_every_missing_field() {
        let principal = Principal {
            subject: "uid-1".to_string(),
            email: None,
        };
        let request = BookAppointmentRequest {
            patient_id: Some("uid-1".to_string()),
            appointment_date: None,
            appointment_time: None,
            service_type: None,
            notes: None,
            patient_email: None,
            patient_phone: None,
        };

        let err = request
            .validate(&principal, &SlotGrid::default())
            .unwrap_err();
        assert_matches!(err, SchedulingError::Validation(msg) => {
            assert!(msg.contains("appointmentDate"));
            assert!(msg.contains("appointmentTime"));
            assert!(msg.contains("serviceType"));
            assert!(msg.contains("patientEmail"));
        });
    }

    #[test]
    fn booking_request_rejects_off_grid_time() {
        let mut request = full_request();
        request.appointment_time = Some("10:15".to_string());

        let err = request
            .validate(&principal(), &SlotGrid::default())
            .unwrap_err();
        assert_matches!(err, SchedulingError::Validation(msg) => {
            assert!(msg.contains("slot grid"));
        });
    }

    #[test]
    fn booking_request_rejects_malformed_date() {
        let mut request = full_request();
        request.appointment_date = Some("10/06/2024".to_string());

        assert_matches!(
            request.validate(&principal(), &SlotGrid::default()),
            Err(SchedulingError::Validation(_))
        );
    }

    #[test]
    fn body_email_fills_in_for_address_less_token() {
        let principal = Principal {
            subject: "uid-1".to_string(),
            email: None,
        };
        let mut request = full_request();
        request.patient_email = Some("fallback@example.com".to_string());

        let command = request.validate(&principal, &SlotGrid::default()).unwrap();
        assert_eq!(command.patient_email, "fallback@example.com");
    }

    #[test]
    fn cancel_request_requires_appointment_id() {
        let request = CancelAppointmentRequest {
            appointment_id: None,
            patient_id: Some("uid-1".to_string()),
            patient_phone: None,
        };

        assert_matches!(
            request.validate(&principal()),
            Err(SchedulingError::Validation(_))
        );
    }
}
