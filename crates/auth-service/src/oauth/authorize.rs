//! Authorization Endpoint
//!
//! The user is identified by the `X-Remote-User` header, set by the fronting proxy after it
//! authenticated the session. Rendering the consent page is left to the frontend; `GET`
//! returns the data it needs as JSON.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use oauth_server::{Approval, Params};

use super::error_response;
use crate::AppState;

pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Handler for `GET /authorize` - returns consent page data
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    match state.server.authorize_validate(&params) {
        Ok(info) => Json(info).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handler for `POST /authorize` - processes the consent form
pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
    Form(form): Form<Params>,
) -> Response {
    let Some(user_id) = remote_user(&headers) else {
        tracing::debug!("POST /authorize without {} header", REMOTE_USER_HEADER);
        return (StatusCode::UNAUTHORIZED, "Not logged in").into_response();
    };

    let approval = match Approval::from_form(&form) {
        Ok(a) => a,
        Err(e) => return error_response(e.into()),
    };

    match state.server.authorize_decide(&params, approval, user_id) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => error_response(e),
    }
}

fn remote_user(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REMOTE_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
}
