//! HTTP surface for eventgate, built on Axum.
//!
//! Handlers are thin: they extract the caller and the request, call one
//! [`eventgate_runtime::EventDesk`] operation and map the outcome to a
//! response. All decisions live in the desk.
//!
//! # Request Flow
//!
//! 1. **Correlation**: every request gets an `X-Correlation-ID` and a span
//! 2. **Identify** the caller from the `X-User-Id` / `X-User-Role` headers
//! 3. **Dispatch** to the desk
//! 4. **Map** the result, or the [`AppError`], to JSON
//!
//! # Example
//!
//! ```ignore
//! use eventgate_runtime::EventDesk;
//! use eventgate_web::{AppState, router};
//!
//! let app = router(AppState::new(desk));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

mod router;

pub use error::AppError;
pub use extractors::{Caller, CorrelationId, MaybeCaller, USER_ID_HEADER, USER_ROLE_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::router;
pub use state::AppState;
