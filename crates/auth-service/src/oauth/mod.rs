//! HTTP endpoints for the authorization server core
//!
//! - `GET /authorize`: validate and return what the consent page shows
//! - `POST /authorize`: apply the user's decision, redirect back to the client
//! - `POST /token`: authorization code exchange

pub mod authorize;
pub mod token;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use oauth_server::{Error, ErrorCode, OAuthError};

/// Render a core error. Protocol errors keep their status and RFC 6749 body; anything else
/// is a 500 `server_error` with no internals exposed.
pub fn error_response(err: Error) -> Response {
    match err {
        Error::OAuth(e) => {
            let status = StatusCode::from_u16(e.status).unwrap_or(StatusCode::BAD_REQUEST);
            let mut response =
                (status, [(header::CACHE_CONTROL, "no-store")], Json(&e)).into_response();
            if status == StatusCode::UNAUTHORIZED {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static("Basic realm=\"OAuth\""),
                );
            }
            response
        }
        other => {
            tracing::error!("Internal error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OAuthError::new(
                    500,
                    ErrorCode::ServerError,
                    "internal server error",
                )),
            )
                .into_response()
        }
    }
}
