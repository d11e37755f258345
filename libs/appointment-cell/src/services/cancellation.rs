use std::sync::Arc;

use tracing::{error, info};

use notification_cell::EventPublisher;
use shared_models::auth::Principal;
use shared_models::events::{DomainEvent, DomainEventType};

use crate::models::{CancelAppointmentRequest, SchedulingError};
use crate::services::store::AppointmentStore;

/// Orchestrates the cancellation use case. The store's conditional update is
/// the only mutation; repeats and foreign ids fall out as `NotFound` with no
/// event emitted.
pub struct CancellationService {
    store: Arc<AppointmentStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl CancellationService {
    pub fn new(store: Arc<AppointmentStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    pub async fn cancel(
        &self,
        principal: &Principal,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let command = request.validate(principal)?;

        let appointment = self
            .store
            .cancel_owned(command.appointment_id, &command.patient_id, auth_token)
            .await?;

        info!(
            "Appointment {} cancelled by patient {}",
            appointment.id, command.patient_id
        );

        // Event fields come from the row snapshot; only `status` changed in
        // the update, and the payload does not carry status.
        let event = DomainEvent {
            event_type: DomainEventType::AppointmentCancelled,
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
                "Failed to publish appointmentCancelled event for appointment {}: {}",
                appointment.id, e
            );
        }

        Ok(())
    }
}
