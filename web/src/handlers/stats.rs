//! Moderator dashboard.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{Json, extract::State};
use eventgate_core::query::Stats;

/// `GET /api/stats/overview`.
///
/// # Errors
///
/// 403 unless the caller is a moderator.
pub async fn overview(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.desk.stats(actor).await?))
}
