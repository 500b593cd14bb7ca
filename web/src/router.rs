//! Route table.

use crate::handlers::{events, health, registrations, stats};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full application router.
///
/// ```text
/// GET    /health                        liveness
/// GET    /ready                         readiness
/// GET    /api/events                    approved events (?date=&location=&category=)
/// POST   /api/events                    submit for review
/// GET    /api/events/pending            moderation queue
/// GET    /api/events/:id                one event
/// PUT    /api/events/:id                organizer edit
/// DELETE /api/events/:id                delete with registrations
/// PUT    /api/events/:id/approve        moderator approval
/// PUT    /api/events/:id/reject         moderator rejection
/// GET    /api/events/:id/registered     caller's registration flag
/// POST   /api/registrations             claim a seat
/// GET    /api/registrations/my          caller's registrations
/// PUT    /api/registrations/:id/cancel  cancel
/// GET    /api/stats/overview            moderator dashboard
/// ```
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/pending", get(events::pending_events))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::edit_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/approve", put(events::approve_event))
        .route("/events/:id/reject", put(events::reject_event))
        .route("/events/:id/registered", get(events::is_registered))
        .route("/registrations", post(registrations::register))
        .route("/registrations/my", get(registrations::my_registrations))
        .route("/registrations/:id/cancel", put(registrations::cancel))
        .route("/stats/overview", get(stats::overview));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
