//! Caller identity.
//!
//! Authentication happens upstream; the identity layer forwards the
//! authenticated user id in a header which is trusted as-is.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

pub const HEADER_USER_ID_KEY: &str = "X-User-Id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

pub struct CallerExtractionError;

impl IntoResponse for CallerExtractionError {
    fn into_response(self) -> axum::response::Response {
        StatusCode::FORBIDDEN.into_response()
    }
}

fn extract_user_id_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_USER_ID_KEY)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = CallerExtractionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_user_id_from_headers(parts) {
            Some(user_id) => Ok(Caller { user_id }),
            None => {
                debug!("No caller identity on {}", parts.uri.path());
                Err(CallerExtractionError)
            }
        }
    }
}
