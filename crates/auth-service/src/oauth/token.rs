//! Token Endpoint
//!
//! Confidential clients authenticate with HTTP Basic (RFC 6749 section 2.3.1).

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use base64::Engine;
use oauth_server::{OAuthError, Params};

use super::error_response;
use crate::AppState;

/// Client credentials from an `Authorization: Basic` header
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Handler for `POST /token`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<Params>,
) -> Response {
    let credentials = match basic_credentials(&headers) {
        Ok(c) => c,
        Err(e) => return error_response(e.into()),
    };

    let result = state.server.token_exchange(
        &form,
        credentials.as_ref().map(|c| c.client_id.as_str()),
        credentials.as_ref().map(|c| c.client_secret.as_str()),
    );

    match result {
        Ok(token) => {
            let mut response = Json(&token.body).into_response();
            *response.status_mut() = StatusCode::from_u16(token.status).unwrap_or(StatusCode::OK);
            for (name, value) in token.headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    response.headers_mut().insert(name, value);
                }
            }
            response
        }
        Err(e) => error_response(e),
    }
}

/// Parse HTTP Basic client credentials. No header (or another scheme) means the client did
/// not authenticate.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<BasicCredentials>, OAuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let malformed =
        || OAuthError::invalid_client("invalid credentials (malformed Authorization header)");

    let value = value.to_str().map_err(|_| malformed())?;
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return Ok(None);
    };
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (client_id, client_secret) = decoded.split_once(':').ok_or_else(malformed)?;

    Ok(Some(BasicCredentials {
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_basic_credentials() {
        // code-client-secret:123456
        let headers = headers_with("Basic Y29kZS1jbGllbnQtc2VjcmV0OjEyMzQ1Ng==");
        assert_eq!(
            basic_credentials(&headers).unwrap(),
            Some(BasicCredentials {
                client_id: "code-client-secret".to_string(),
                client_secret: "123456".to_string(),
            })
        );
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(basic_credentials(&HeaderMap::new()).unwrap(), None);
        assert_eq!(basic_credentials(&headers_with("Bearer abc")).unwrap(), None);
    }

    #[test]
    fn test_malformed_credentials() {
        let err = basic_credentials(&headers_with("Basic !!!")).unwrap_err();
        assert_eq!(err.status, 401);
        // "no-colon" without a separator
        assert!(basic_credentials(&headers_with("Basic bm8tY29sb24=")).is_err());
    }
}
