//! Caller identity resolved from gateway headers
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user's numeric id in `x-user-id`; requests without it are anonymous.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::{error::AppError, models::Caller};

/// Header carrying the authenticated user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the client's browsing session
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Trimmed, non-empty value of a header
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = header_str(&parts.headers, USER_ID_HEADER) else {
            return Ok(Caller::Anonymous);
        };

        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Caller::User(id)),
            _ => {
                tracing::warn!(header = USER_ID_HEADER, value = raw, "Rejecting malformed caller identity");
                Err(AppError::Unauthenticated)
            }
        }
    }
}

/// Optional session id from `x-session-id`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionId(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionId(
            header_str(&parts.headers, SESSION_ID_HEADER).map(str::to_string),
        ))
    }
}
