use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::{header::HeaderMap, Method};
use serde::Deserialize;
use tracing::debug;

use shared_database::PostgrestClient;

use crate::models::{Appointment, NewAppointment, SchedulingError};

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    appointment_time: NaiveTime,
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

/// Owns the `appointments` rows.
///
/// Slot exclusivity (at most one `booked` row per date/time) is the
/// datastore's partial unique index, so `create_if_free` is one conditional
/// insert and `cancel_owned` one conditional update; there is no
/// read-then-write window anywhere in the mutation paths.
pub struct AppointmentStore {
    db: Arc<PostgrestClient>,
}

impl AppointmentStore {
    pub fn new(db: Arc<PostgrestClient>) -> Self {
        Self { db }
    }

    /// Times holding an active booking on the given date.
    pub async fn booked_times(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashSet<NaiveTime>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?appointment_date=eq.{}&status=eq.booked&select=appointment_time",
            date
        );

        let rows: Vec<BookedTimeRow> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(rows.into_iter().map(|row| row.appointment_time).collect())
    }

    /// Insert the appointment if its slot is free. A concurrent booking for
    /// the same slot loses the race on the unique index and observes
    /// `SlotTaken`.
    pub async fn create_if_free(
        &self,
        appointment: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Inserting appointment for patient {} on {} at {}",
            appointment.patient_id, appointment.appointment_date, appointment.appointment_time
        );

        let result: Vec<Appointment> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(serde_json::to_value(appointment)?),
                Some(representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Insert returned no representation".to_string()))
    }

    /// Flip a booked row owned by `patient_id` to cancelled and return it.
    /// Unknown id, foreign owner, and already-cancelled all surface as
    /// `NotFound`; callers cannot tell them apart.
    pub async fn cancel_owned(
        &self,
        appointment_id: i64,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}&status=eq.booked",
            appointment_id, patient_id
        );

        let result: Vec<Appointment> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(serde_json::json!({ "status": "cancelled" })),
                Some(representation_headers()),
            )
            .await?;

        result.into_iter().next().ok_or(SchedulingError::NotFound)
    }

    /// Every appointment the patient has ever held, newest slot first.
    pub async fn list_by_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_date.desc,appointment_time.desc",
            patient_id
        );

        let appointments: Vec<Appointment> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(appointments)
    }
}
