use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::models::SchedulingError;
use crate::services::slots::SlotGrid;
use crate::services::store::AppointmentStore;

/// Read-only slot queries: the day's grid minus its active bookings.
pub struct AvailabilityService {
    store: Arc<AppointmentStore>,
    grid: SlotGrid,
}

impl AvailabilityService {
    pub fn new(store: Arc<AppointmentStore>) -> Self {
        Self {
            store,
            grid: SlotGrid::default(),
        }
    }

    pub async fn available_slots(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, SchedulingError> {
        let booked = self.store.booked_times(date, auth_token).await?;
        let available = self.grid.available(&booked);

        debug!("{} slots available on {}", available.len(), date);
        Ok(available)
    }
}
