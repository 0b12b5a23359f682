//! Correlation ids for recommendation traffic
//!
//! Every request carries an `x-request-id`, either forwarded by the gateway
//! or minted here. The trace span also names the caller so a feed, its
//! exposure writes and later feedback can be followed per user.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::middleware::caller::{header_str, SESSION_ID_HEADER, USER_ID_HEADER};

/// HTTP header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id stored in the request extensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The gateway's id when it forwarded a well-formed one
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        header_str(headers, REQUEST_ID_HEADER)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stores the request's [`RequestId`] in its extensions and echoes it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(request.headers()).unwrap_or_default();
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Raw caller label for spans, before the identity is validated
fn caller_label(headers: &HeaderMap) -> &str {
    header_str(headers, USER_ID_HEADER).unwrap_or("anonymous")
}

/// `TraceLayer` span naming the request id, caller and browsing session
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let headers = request.headers();

    tracing::info_span!(
        "recommendation_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
        caller = caller_label(headers),
        session = header_str(headers, SESSION_ID_HEADER).unwrap_or("-"),
    )
}
