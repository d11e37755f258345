use std::sync::Arc;

use tracing::{error, info};

use notification_cell::EventPublisher;
use shared_models::auth::Principal;
use shared_models::events::{DomainEvent, DomainEventType};

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, NewAppointment, SchedulingError,
};
use crate::services::slots::SlotGrid;
use crate::services::store::AppointmentStore;

/// Orchestrates the booking use case: validate, conditionally create, then
/// announce the committed state change.
pub struct BookingService {
    store: Arc<AppointmentStore>,
    publisher: Arc<dyn EventPublisher>,
    grid: SlotGrid,
}

impl BookingService {
    pub fn new(store: Arc<AppointmentStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            grid: SlotGrid::default(),
        }
    }

    pub async fn book(
        &self,
        principal: &Principal,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let command = request.validate(principal, &self.grid)?;

        info!(
            "Booking appointment for patient {} on {} at {}",
            command.patient_id, command.appointment_date, command.appointment_time
        );

        let new_appointment = NewAppointment {
            patient_id: command.patient_id.clone(),
            patient_email: command.patient_email.clone(),
            appointment_date: command.appointment_date,
            appointment_time: command.appointment_time,
            service_type: command.service_type.clone(),
            notes: command.notes.clone(),
            status: AppointmentStatus::Booked,
        };

        let appointment = self.store.create_if_free(&new_appointment, auth_token).await?;

        info!(
            "Appointment {} booked for patient {}",
            appointment.id, appointment.patient_id
        );

        // The insert has committed; the booking stands whatever happens to
        // the announcement.
        let event = DomainEvent {
            event_type: DomainEventType::AppointmentBooked,
            appointment_id: appointment.id,
            patient_id: appointment.patient_id.clone(),
            patient_email: appointment.patient_email.clone(),
            patient_phone: command.patient_phone,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            service_type: appointment.service_type.clone(),
            notes: appointment.notes.clone(),
        };

        if let Err(e) = self.publisher.publish(&event).await {
            error!(
                "Failed to publish appointmentBooked event for appointment {}: {}",
                appointment.id, e
            );
        }

        Ok(appointment)
    }
}
