//! Custom Axum extractors.
//!
//! - [`Caller`]: the authenticated actor, required
//! - [`MaybeCaller`]: the actor if one is present, for public reads
//! - [`CorrelationId`]: the request's correlation ID
//!
//! Identity is asserted by the authentication proxy in front of this
//! service through two trusted headers:
//!
//! ```text
//! X-User-Id:   <uuid>
//! X-User-Role: member | admin     (optional, defaults to member)
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use eventgate_core::types::{Actor, Role, UserId};
use std::convert::Infallible;
use uuid::Uuid;

/// Header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The authenticated caller. Rejects with 401 when the identity headers are
/// missing or malformed.
///
/// # Example
///
/// ```ignore
/// async fn handler(Caller(actor): Caller) -> String {
///     format!("hello {}", actor.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)?
            .map(Self)
            .ok_or_else(|| AppError::unauthorized(format!("missing {USER_ID_HEADER} header")))
    }
}

/// The caller if identified, `None` for anonymous requests.
///
/// Identity headers that are present but malformed still reject with 401.
#[derive(Debug, Clone, Copy)]
pub struct MaybeCaller(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(Self)
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Option<Actor>, AppError> {
    let Some(user_id) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let user_id: UserId = user_id
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

    let role = match headers.get(USER_ROLE_HEADER) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse::<Role>().ok())
            .ok_or_else(|| {
                AppError::unauthorized(format!("malformed {USER_ROLE_HEADER} header"))
            })?,
        None => Role::default(),
    };

    Ok(Some(Actor { user_id, role }))
}

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a new UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<CorrelationId>()
            .map(|id| id.0)
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}
