use std::sync::Arc;

use notification_cell::EventPublisher;
use shared_config::AppConfig;

use crate::services::store::AppointmentStore;

/// Process-wide singletons behind the scheduling endpoints, constructed once
/// at startup and shared across request handlers.
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub store: Arc<AppointmentStore>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl SchedulingState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<AppointmentStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            store,
            publisher,
        }
    }
}
