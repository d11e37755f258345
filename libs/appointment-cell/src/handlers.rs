use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_utils::extractor::assert_ownership;

use crate::models::{
    AppointmentsQuery, AvailabilityRequest, BookAppointmentRequest, CancelAppointmentRequest,
    SchedulingError,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;
use crate::services::cancellation::CancellationService;
use crate::services::history::HistoryService;
use crate::state::SchedulingState;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients book for themselves only; a missing claim is a mismatch.
    let claimed = request.patient_id.clone().unwrap_or_default();
    assert_ownership(&principal, &claimed)?;

    let booking_service = BookingService::new(state.store.clone(), state.publisher.clone());

    let appointment = booking_service
        .book(&principal, request, token)
        .await
        .map_err(|e| match e {
            SchedulingError::SlotTaken => {
                AppError::Conflict("Appointment slot no longer available".to_string())
            }
            SchedulingError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Dependency(other.to_string()),
        })?;

    Ok(Json(json!({
        "message": "Appointment booked successfully",
        "appointmentId": appointment.id
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let claimed = request.patient_id.clone().unwrap_or_default();
    assert_ownership(&principal, &claimed)?;

    let cancellation_service =
        CancellationService::new(state.store.clone(), state.publisher.clone());

    cancellation_service
        .cancel(&principal, request, token)
        .await
        .map_err(|e| match e {
            SchedulingError::NotFound => AppError::NotFound(
                "Appointment not found, or you do not have permission to cancel it, or it's already cancelled".to_string(),
            ),
            SchedulingError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Dependency(other.to_string()),
        })?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_principal): Extension<Principal>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let date = request.validate().map_err(|e| match e {
        SchedulingError::Validation(msg) => AppError::Validation(msg),
        other => AppError::Dependency(other.to_string()),
    })?;

    let availability_service = AvailabilityService::new(state.store.clone());

    let slots = availability_service
        .available_slots(date, token)
        .await
        .map_err(|e| AppError::Dependency(e.to_string()))?;

    let slots: Vec<String> = slots
        .into_iter()
        .map(|slot| slot.format("%H:%M").to_string())
        .collect();

    Ok(Json(json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    fetch_appointments(&state, auth.token(), &principal, query.patient_id.as_deref()).await
}

#[axum::debug_handler]
pub async fn list_appointments_post(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(query): Json<AppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    fetch_appointments(&state, auth.token(), &principal, query.patient_id.as_deref()).await
}

async fn fetch_appointments(
    state: &SchedulingState,
    token: &str,
    principal: &Principal,
    advisory: Option<&str>,
) -> Result<Json<Value>, AppError> {
    let history_service = HistoryService::new(state.store.clone());

    let appointments = history_service
        .list_appointments(principal, advisory, token)
        .await
        .map_err(|e| AppError::Dependency(e.to_string()))?;

    Ok(Json(json!({
        "appointments": appointments
    })))
}
