use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::scheduling_routes;
use appointment_cell::state::SchedulingState;

pub fn create_router(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .merge(scheduling_routes(state))
}
