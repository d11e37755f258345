use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::SchedulingState;

pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    // Every scheduling operation requires authentication
    let protected_routes = Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/cancel", post(handlers::cancel_appointment))
        .route("/availability", post(handlers::get_availability))
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::list_appointments_post),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
