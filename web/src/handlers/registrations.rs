//! Registration endpoints.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use eventgate_core::query::RegistrationView;
use eventgate_core::registration::{CancelOutcome, Registration};
use eventgate_core::types::{EventId, RegistrationId};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/registrations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Event to claim a seat at.
    pub event_id: EventId,
    /// Optional note for the organizer.
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /api/registrations`: claim a seat.
///
/// # Errors
///
/// 409 with `NOT_APPROVED`, `ALREADY_REGISTERED` or `CAPACITY_FULL` when
/// the claim is refused, 404 for an unknown event.
pub async fn register(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let Json(request) = body?;
    let registration = state
        .desk
        .try_register(request.event_id, actor.user_id, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `GET /api/registrations/my`: the caller's registrations, soonest event
/// first.
///
/// # Errors
///
/// 503 when storage is down.
pub async fn my_registrations(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<RegistrationView>>, AppError> {
    Ok(Json(state.desk.user_registrations(actor.user_id).await?))
}

/// `PUT /api/registrations/:id/cancel`. Cancelling twice succeeds with
/// `changed: false`.
///
/// # Errors
///
/// 403 unless the caller holds the registration.
pub async fn cancel(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<CancelOutcome>, AppError> {
    let registration_id: RegistrationId = id.parse()?;
    Ok(Json(state.desk.cancel(registration_id, actor.user_id).await?))
}
