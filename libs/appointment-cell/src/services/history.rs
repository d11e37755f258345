use std::sync::Arc;

use tracing::warn;

use shared_models::auth::Principal;

use crate::models::{Appointment, SchedulingError};
use crate::services::store::AppointmentStore;

/// Appointment history for the authenticated patient, every status included.
pub struct HistoryService {
    store: Arc<AppointmentStore>,
}

impl HistoryService {
    pub fn new(store: Arc<AppointmentStore>) -> Self {
        Self { store }
    }

    /// Always scoped to the principal. A `patientId` in the request is
    /// advisory only; it can neither widen nor narrow the result.
    pub async fn list_appointments(
        &self,
        principal: &Principal,
        advisory_patient_id: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if let Some(advisory) = advisory_patient_id {
            if advisory != principal.subject {
                warn!(
                    "Request patientId ({}) does not match authenticated subject ({}), proceeding with authenticated subject",
                    advisory, principal.subject
                );
            }
        }

        self.store
            .list_by_patient(&principal.subject, auth_token)
            .await
    }
}
