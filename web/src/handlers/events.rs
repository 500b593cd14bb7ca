//! Event endpoints: listing, moderation and organizer management.

use crate::error::AppError;
use crate::extractors::{Caller, MaybeCaller};
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::NaiveDate;
use eventgate_core::event::{Event, EventDraft, EventPatch};
use eventgate_core::query::EventView;
use eventgate_core::store::EventFilter;
use eventgate_core::types::EventId;
use eventgate_runtime::DeletedEvent;
use serde::{Deserialize, Serialize};

/// Query string of `GET /api/events`. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Venue, case-insensitive.
    pub location: Option<String>,
    /// Category, case-insensitive.
    pub category: Option<String>,
}

impl ListParams {
    fn into_filter(self) -> Result<EventFilter, AppError> {
        let mut filter = EventFilter::approved();
        if let Some(date) = non_blank(self.date) {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|_| AppError::bad_request(format!("invalid date: {date}")))?;
            filter = filter.with_date(date);
        }
        if let Some(location) = non_blank(self.location) {
            filter = filter.with_location(location);
        }
        if let Some(category) = non_blank(self.category) {
            filter = filter.with_category(category);
        }
        Ok(filter)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Body of `GET /api/events/:id/registered`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredResponse {
    /// Whether the caller holds a confirmed seat.
    pub registered: bool,
}

/// `GET /api/events`: approved events with live occupancy.
///
/// # Errors
///
/// 400 for a malformed query string.
pub async fn list_events(
    State(state): State<AppState>,
    MaybeCaller(viewer): MaybeCaller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, AppError> {
    let Query(params) = params?;
    let events = state
        .desk
        .list_events(params.into_filter()?, viewer.map(|a| a.user_id))
        .await?;
    Ok(Json(events))
}

/// `POST /api/events`: submit an event for review.
///
/// # Errors
///
/// 422 for an invalid draft.
pub async fn create_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<EventDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let Json(draft) = body?;
    let event = state.desk.create_event(draft, actor).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /api/events/pending`: the moderation queue.
///
/// # Errors
///
/// 403 unless the caller is a moderator.
pub async fn pending_events(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<EventView>>, AppError> {
    Ok(Json(state.desk.pending_events(actor).await?))
}

/// `GET /api/events/:id`.
///
/// # Errors
///
/// 404 when the event does not exist or is hidden from the caller.
pub async fn get_event(
    State(state): State<AppState>,
    MaybeCaller(viewer): MaybeCaller,
    Path(id): Path<String>,
) -> Result<Json<EventView>, AppError> {
    let event_id: EventId = id.parse()?;
    Ok(Json(state.desk.get_event(event_id, viewer).await?))
}

/// `PUT /api/events/:id`: organizer edit; the event goes back to review.
///
/// # Errors
///
/// 403 for anyone but the organizer, 422 for an invalid patch.
pub async fn edit_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    body: Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<Event>, AppError> {
    let event_id: EventId = id.parse()?;
    let Json(patch) = body?;
    Ok(Json(state.desk.edit_event(event_id, patch, actor).await?))
}

/// `DELETE /api/events/:id`: remove the event and its registrations.
///
/// # Errors
///
/// 403 for anyone but the organizer.
pub async fn delete_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<DeletedEvent>, AppError> {
    let event_id: EventId = id.parse()?;
    Ok(Json(state.desk.delete_event(event_id, actor).await?))
}

/// `PUT /api/events/:id/approve`.
///
/// # Errors
///
/// 403 unless the caller is a moderator, 409 unless the event is pending.
pub async fn approve_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Event>, AppError> {
    let event_id: EventId = id.parse()?;
    Ok(Json(state.desk.approve(event_id, actor).await?))
}

/// `PUT /api/events/:id/reject`.
///
/// # Errors
///
/// 403 unless the caller is a moderator, 409 unless the event is pending.
pub async fn reject_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Event>, AppError> {
    let event_id: EventId = id.parse()?;
    Ok(Json(state.desk.reject(event_id, actor).await?))
}

/// `GET /api/events/:id/registered`.
///
/// # Errors
///
/// 400 for a malformed id.
pub async fn is_registered(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<RegisteredResponse>, AppError> {
    let event_id: EventId = id.parse()?;
    let registered = state.desk.is_registered(event_id, actor.user_id).await?;
    Ok(Json(RegisteredResponse { registered }))
}
