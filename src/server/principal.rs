//! Principal extraction.
//!
//! Identity is an external collaborator: each request carries an opaque
//! principal identifier issued upstream. This subsystem never sees
//! credentials, only the identifier.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};

pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// The opaque principal identifier attached to the request.
#[derive(Debug, Clone)]
pub struct Principal(pub String);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| Principal(value.to_string()))
            .ok_or((StatusCode::UNAUTHORIZED, "missing principal identifier"))
    }
}
