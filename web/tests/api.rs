//! End-to-end tests of the HTTP surface over the in-memory backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use eventgate_core::types::{Actor, UserId};
use eventgate_runtime::{DeskConfig, DeskEnvironment, EventDesk};
use eventgate_testing::{FlakyStore, InMemoryStore, test_clock};
use eventgate_web::{AppState, USER_ID_HEADER, USER_ROLE_HEADER, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: FlakyStore,
    admin: Actor,
}

impl TestApp {
    fn new() -> Self {
        let store = FlakyStore::new(InMemoryStore::new());
        let desk = EventDesk::new(
            Arc::new(store.clone()),
            DeskEnvironment::new(Arc::new(test_clock())),
            DeskConfig::default(),
        );
        Self {
            router: router(AppState::new(desk)),
            store,
            admin: Actor::admin(UserId::new()),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<Actor>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(actor) = caller {
            request = request
                .header(USER_ID_HEADER, actor.user_id.to_string())
                .header(USER_ROLE_HEADER, actor.role.as_str());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    /// Submit and approve an event, returning its id.
    async fn published_event(&self, organizer: Actor, capacity: u32) -> String {
        let (status, event) = self
            .send(Method::POST, "/api/events", Some(organizer), Some(draft(capacity)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = event["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .send(
                Method::PUT,
                &format!("/api/events/{id}/approve"),
                Some(self.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    async fn register(&self, user: Actor, event_id: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/registrations",
            Some(user),
            Some(json!({ "event_id": event_id, "notes": "vegetarian" })),
        )
        .await
    }
}

fn draft(capacity: u32) -> Value {
    json!({
        "title": "Rust meetup",
        "description": "Talks and pizza",
        "date": "2025-06-14",
        "time": "18:30",
        "location": "Hall A",
        "category": "Tech",
        "capacity": capacity,
    })
}

fn member() -> Actor {
    Actor::member(UserId::new())
}

#[tokio::test]
async fn health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    app.store.go_down();
    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn submitted_events_wait_for_approval() {
    let app = TestApp::new();
    let organizer = member();

    let (status, event) = app
        .send(Method::POST, "/api/events", Some(organizer), Some(draft(10)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["state"], "pending");
    let id = event["id"].as_str().unwrap().to_string();

    let (_, listed) = app.send(Method::GET, "/api/events", None, None).await;
    assert_eq!(listed, json!([]));

    // Hidden from strangers, visible to the organizer.
    let (status, _) = app
        .send(Method::GET, &format!("/api/events/{id}"), Some(member()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(Method::GET, &format!("/api/events/{id}"), Some(organizer), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, queue) = app
        .send(Method::GET, "/api/events/pending", Some(app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, body) = app.register(member(), &id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_APPROVED");

    let (status, approved) = app
        .send(Method::PUT, &format!("/api/events/{id}/approve"), Some(app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["state"], "approved");

    let (_, listed) = app.send(Method::GET, "/api/events", None, None).await;
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["registered_count"], 0);
    assert_eq!(listed[0]["seats_left"], 10);
    assert_eq!(listed[0]["phase"], "open");
}

#[tokio::test]
async fn register_check_and_cancel() {
    let app = TestApp::new();
    let attendee = member();
    let event_id = app.published_event(member(), 5).await;

    let (status, registration) = app.register(attendee, &event_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registration["status"], "confirmed");
    assert_eq!(registration["notes"], "vegetarian");
    let registration_id = registration["id"].as_str().unwrap().to_string();

    let (status, body) = app.register(attendee, &event_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REGISTERED");

    let uri = format!("/api/events/{event_id}/registered");
    let (_, flag) = app.send(Method::GET, &uri, Some(attendee), None).await;
    assert_eq!(flag, json!({ "registered": true }));

    let (_, view) = app
        .send(Method::GET, &format!("/api/events/{event_id}"), Some(attendee), None)
        .await;
    assert_eq!(view["registered_count"], 1);
    assert_eq!(view["is_registered"], true);

    let (status, mine) = app
        .send(Method::GET, "/api/registrations/my", Some(attendee), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["event"]["title"], "Rust meetup");

    let cancel = format!("/api/registrations/{registration_id}/cancel");
    let (status, body) = app.send(Method::PUT, &cancel, Some(member()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, outcome) = app.send(Method::PUT, &cancel, Some(attendee), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["changed"], true);
    assert_eq!(outcome["registration"]["status"], "cancelled");

    let (status, outcome) = app.send(Method::PUT, &cancel, Some(attendee), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["changed"], false);

    let (_, flag) = app.send(Method::GET, &uri, Some(attendee), None).await;
    assert_eq!(flag, json!({ "registered": false }));
}

#[tokio::test]
async fn last_seat_goes_to_one_caller() {
    let app = TestApp::new();
    let event_id = app.published_event(member(), 1).await;

    let (status, _) = app.register(member(), &event_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.register(member(), &event_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_FULL");

    let (_, view) = app
        .send(Method::GET, &format!("/api/events/{event_id}"), None, None)
        .await;
    assert_eq!(view["phase"], "full");
}

#[tokio::test]
async fn identity_is_required() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/api/events", None, Some(draft(3)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/registrations/my")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moderation_is_admin_only() {
    let app = TestApp::new();
    let organizer = member();

    let (_, event) = app
        .send(Method::POST, "/api/events", Some(organizer), Some(draft(3)))
        .await;
    let id = event["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::PUT, &format!("/api/events/{id}/approve"), Some(organizer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, "/api/events/pending", Some(organizer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, "/api/stats/overview", Some(organizer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rejected) = app
        .send(Method::PUT, &format!("/api/events/{id}/reject"), Some(app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["state"], "rejected");

    let (status, body) = app
        .send(Method::PUT, &format!("/api/events/{id}/approve"), Some(app.admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, stats) = app
        .send(Method::GET, "/api/stats/overview", Some(app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["events"]["rejected"], 1);
    assert_eq!(stats["registrations"]["confirmed"], 0);
}

#[tokio::test]
async fn edits_send_events_back_to_review() {
    let app = TestApp::new();
    let organizer = member();
    let event_id = app.published_event(organizer, 3).await;
    let uri = format!("/api/events/{event_id}");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(member()), Some(json!({ "title": "Hijacked" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = app
        .send(Method::PUT, &uri, Some(organizer), Some(json!({ "title": "Rust meetup #2" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["title"], "Rust meetup #2");
    assert_eq!(edited["state"], "pending");

    let (status, body) = app.register(member(), &event_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_APPROVED");
}

#[tokio::test]
async fn delete_removes_registrations() {
    let app = TestApp::new();
    let organizer = member();
    let event_id = app.published_event(organizer, 3).await;
    app.register(member(), &event_id).await;
    let uri = format!("/api/events/{event_id}");

    let (status, _) = app.send(Method::DELETE, &uri, Some(member()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, deleted) = app.send(Method::DELETE, &uri, Some(organizer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["registrations_removed"], 1);
    assert_eq!(app.store.inner().registration_count(), 0);

    let (status, body) = app.send(Method::GET, &uri, Some(organizer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn bad_input_is_reported_as_json() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/api/events", Some(member()), Some(draft(0)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(Method::POST, "/api/events", Some(member()), Some(json!({ "title": 1 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(Method::GET, "/api/events/not-an-id", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = app
        .send(Method::GET, "/api/events?date=tomorrow", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .register(member(), &UserId::new().to_string())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn listing_filters_by_query() {
    let app = TestApp::new();
    app.published_event(member(), 3).await;

    let (_, hit) = app
        .send(Method::GET, "/api/events?location=hall%20a&category=TECH", None, None)
        .await;
    assert_eq!(hit.as_array().unwrap().len(), 1);

    let (_, miss) = app
        .send(Method::GET, "/api/events?date=2025-06-15", None, None)
        .await;
    assert_eq!(miss, json!([]));

    let (_, blank) = app
        .send(Method::GET, "/api/events?date=&location=", None, None)
        .await;
    assert_eq!(blank.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn storage_outage_is_service_unavailable() {
    let app = TestApp::new();
    app.store.go_down();

    let (status, body) = app.send(Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}
