//! Authorization endpoint: request validation, the user's decision, and the redirect back to
//! the client carrying a code, an access token, or an error.

use serde::Serialize;
use url::form_urlencoded;

use crate::client::{ClientRegistration, ResponseType};
use crate::codec::{self, TokenClaims};
use crate::error::{ErrorCode, OAuthError, Result};
use crate::params::{self, Params};
use crate::server::OAuthServer;
use crate::storage::AuthorizationCode;

/// The only supported PKCE method
pub const CODE_CHALLENGE_METHOD_S256: &str = "S256";

/// Authorization request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub client_id: String,
    pub redirect_uri: String,
    /// Kept as sent; checked against the client's registration
    pub response_type: String,
    /// Opaque, passed through unchanged
    pub scope: String,
    /// Opaque, passed through unchanged
    pub state: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

impl AuthorizeRequest {
    /// Extract and syntax-check the request from query parameters.
    pub fn from_params(params: &Params) -> std::result::Result<Self, OAuthError> {
        let client_id = params::required(params, "client_id")?;
        let redirect_uri = params::required(params, "redirect_uri")?;
        let response_type = params::required(params, "response_type")?;
        let scope = params::required(params, "scope")?;
        let state = params::required(params, "state")?;

        params::check_vschar("client_id", client_id)?;
        params::check_vschar("state", state)?;
        params::check_scope(scope)?;

        let code_challenge = params::optional(params, "code_challenge");
        if let Some(challenge) = code_challenge {
            params::check_pkce_value("code_challenge", challenge)?;
        }
        let code_challenge_method = params::optional(params, "code_challenge_method");
        if let Some(method) = code_challenge_method {
            if method != CODE_CHALLENGE_METHOD_S256 {
                return Err(OAuthError::invalid_request(
                    "code_challenge_method must be \"S256\"",
                ));
            }
        }

        Ok(Self {
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            response_type: response_type.to_string(),
            scope: scope.to_string(),
            state: state.to_string(),
            code_challenge: code_challenge.map(str::to_string),
            code_challenge_method: code_challenge_method.map(str::to_string),
        })
    }
}

/// What the consent page shows the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizeInfo {
    pub client_id: String,
    pub display_name: String,
    pub scope: String,
    pub redirect_uri: String,
}

/// The user's answer to the consent prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Approved,
    Denied,
}

impl Approval {
    /// Parse the `approve` form field: `yes` or `no`.
    pub fn from_form(form: &Params) -> std::result::Result<Self, OAuthError> {
        match params::required(form, "approve")? {
            "yes" => Ok(Approval::Approved),
            "no" => Ok(Approval::Denied),
            _ => Err(OAuthError::invalid_request("invalid \"approve\" parameter")),
        }
    }
}

impl OAuthServer {
    /// Validate an authorization request and return what to show the user.
    ///
    /// Never mutates state and never draws randomness.
    pub fn authorize_validate(&self, params: &Params) -> Result<AuthorizeInfo> {
        let request = AuthorizeRequest::from_params(params).inspect_err(log_rejection)?;
        let client = self.validate_request(&request).inspect_err(log_rejection)?;

        Ok(AuthorizeInfo {
            client_id: client.client_id,
            display_name: client.display_name,
            scope: request.scope,
            redirect_uri: client.redirect_uri,
        })
    }

    /// Apply the user's decision and return the URL to redirect the user agent to.
    pub fn authorize_decide(
        &self,
        params: &Params,
        approval: Approval,
        user_id: &str,
    ) -> Result<String> {
        let request = AuthorizeRequest::from_params(params).inspect_err(log_rejection)?;
        let client = self.validate_request(&request).inspect_err(log_rejection)?;

        match (approval, client.response_type) {
            (Approval::Denied, response_type) => {
                tracing::info!(
                    "User {} refused authorization for client {}",
                    user_id,
                    client.client_id
                );
                let error = [
                    ("error", ErrorCode::AccessDenied.as_str()),
                    ("error_description", "user refused authorization"),
                    ("state", request.state.as_str()),
                ];
                Ok(match response_type {
                    ResponseType::Token => append_to_fragment(&request.redirect_uri, &error),
                    ResponseType::Code => append_to_query(&request.redirect_uri, &error),
                })
            }
            (Approval::Approved, ResponseType::Token) => {
                self.issue_implicit_token(&request, user_id)
            }
            (Approval::Approved, ResponseType::Code) => {
                self.issue_code(&request, &client, user_id)
                    .inspect_err(log_rejection)
            }
        }
    }

    /// Client lookup, then redirect URI, then response type. The order decides which error
    /// is reported when several checks fail.
    fn validate_request(
        &self,
        request: &AuthorizeRequest,
    ) -> std::result::Result<ClientRegistration, OAuthError> {
        let client = self.registry.lookup(&request.client_id).ok_or_else(|| {
            OAuthError::new(400, ErrorCode::InvalidClient, "client not registered")
        })?;

        if request.redirect_uri != client.redirect_uri {
            return Err(OAuthError::invalid_request(
                "\"redirect_uri\" does not match the registered redirect URI",
            ));
        }

        if ResponseType::parse(&request.response_type) != Some(client.response_type) {
            return Err(OAuthError::new(
                400,
                ErrorCode::UnsupportedResponseType,
                format!("\"response_type\" must be \"{}\"", client.response_type),
            ));
        }

        tracing::debug!("Validated authorization request for client {}", client.client_id);
        Ok(client)
    }

    fn issue_implicit_token(&self, request: &AuthorizeRequest, user_id: &str) -> Result<String> {
        let now = self.now();
        let expires_at = self.access_token_expiry(now)?;
        let pair = codec::generate_pair(self.random.as_ref());
        let claims = TokenClaims {
            token_id: &pair.identifier,
            client_id: &request.client_id,
            user_id,
            scope: &request.scope,
            expires_at: expires_at.timestamp(),
        };
        let secret = self.seal_access_token(&claims, pair.secret.clone())?;
        let access_token = codec::render(&pair.identifier, &secret);
        let expires_in = self.config.access_token_lifetime_secs.to_string();

        tracing::info!(
            "Issued access token {} to client {} (implicit)",
            pair.identifier,
            request.client_id
        );

        Ok(append_to_fragment(
            &request.redirect_uri,
            &[
                ("access_token", access_token.as_str()),
                ("state", request.state.as_str()),
                ("expires_in", expires_in.as_str()),
            ],
        ))
    }

    fn issue_code(
        &self,
        request: &AuthorizeRequest,
        client: &ClientRegistration,
        user_id: &str,
    ) -> Result<String> {
        let code_challenge = match (&request.code_challenge, &request.code_challenge_method) {
            (Some(challenge), Some(_)) => Some(challenge.clone()),
            (None, None) if client.is_confidential() => None,
            (None, _) => return Err(OAuthError::missing_parameter("code_challenge").into()),
            (Some(_), None) => {
                return Err(OAuthError::missing_parameter("code_challenge_method").into());
            }
        };

        let now = self.now();
        let expires_at = self.code_expiry(now)?;
        let pair = codec::generate_pair(self.random.as_ref());
        self.store.store_code(AuthorizationCode {
            code_id: pair.identifier.clone(),
            code_secret_hash: codec::hash_secret(&pair.secret),
            user_id: user_id.to_string(),
            client_id: request.client_id.clone(),
            scope: request.scope.clone(),
            redirect_uri: request.redirect_uri.clone(),
            issued_at: now,
            expires_at,
            code_challenge,
        })?;

        tracing::info!(
            "Issued authorization code {} to client {}",
            pair.identifier,
            request.client_id
        );

        let code = pair.render();
        Ok(append_to_query(
            &request.redirect_uri,
            &[("code", code.as_str()), ("state", request.state.as_str())],
        ))
    }
}

fn log_rejection(err: &impl std::fmt::Display) {
    tracing::warn!("Rejected authorization request: {}", err);
}

fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Separator needed before appending parameters to `existing` delimited by `start`.
fn separator(existing: &str, start: char) -> &'static str {
    match existing.rfind(start) {
        None => {
            if start == '?' {
                "?"
            } else {
                "#"
            }
        }
        Some(i) if i + 1 == existing.len() || existing.ends_with('&') => "",
        Some(_) => "&",
    }
}

/// Append parameters to the query component, keeping any existing query parameters and any
/// fragment.
pub fn append_to_query(uri: &str, pairs: &[(&str, &str)]) -> String {
    let (base, fragment) = match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    };
    let mut out = format!("{}{}{}", base, separator(base, '?'), encode_pairs(pairs));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Append parameters to the fragment, joining with `&` if a fragment already exists.
pub fn append_to_fragment(uri: &str, pairs: &[(&str, &str)]) -> String {
    format!("{}{}{}", uri, separator(uri, '#'), encode_pairs(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_to_query() {
        assert_eq!(
            append_to_query("http://example.org/code-cb", &[("code", "a.b"), ("state", "1")]),
            "http://example.org/code-cb?code=a.b&state=1"
        );
        assert_eq!(
            append_to_query("http://example.org/code-cb?keep=this", &[("code", "a.b")]),
            "http://example.org/code-cb?keep=this&code=a.b"
        );
        assert_eq!(
            append_to_query("http://example.org/cb?", &[("code", "a.b")]),
            "http://example.org/cb?code=a.b"
        );
        assert_eq!(
            append_to_query("http://example.org/cb?x=1#frag", &[("code", "a.b")]),
            "http://example.org/cb?x=1&code=a.b#frag"
        );
    }

    #[test]
    fn test_append_to_fragment() {
        assert_eq!(
            append_to_fragment("http://example.org/token-cb", &[("access_token", "a.b")]),
            "http://example.org/token-cb#access_token=a.b"
        );
        assert_eq!(
            append_to_fragment("http://example.org/token-cb#x=1", &[("state", "1")]),
            "http://example.org/token-cb#x=1&state=1"
        );
        assert_eq!(
            append_to_fragment("http://example.org/token-cb?q=1", &[("state", "1")]),
            "http://example.org/token-cb?q=1#state=1"
        );
    }

    #[test]
    fn test_form_encoding_uses_plus_for_space() {
        assert_eq!(
            encode_pairs(&[("error_description", "user refused authorization")]),
            "error_description=user+refused+authorization"
        );
    }

    #[test]
    fn test_approval_from_form() {
        let form = |v: &str| Params::from([("approve".to_string(), v.to_string())]);
        assert_eq!(Approval::from_form(&form("yes")).unwrap(), Approval::Approved);
        assert_eq!(Approval::from_form(&form("no")).unwrap(), Approval::Denied);
        assert!(Approval::from_form(&form("maybe")).is_err());
        assert!(Approval::from_form(&Params::new()).is_err());
    }

    #[test]
    fn test_request_rejects_unknown_challenge_method() {
        let params = Params::from([
            ("client_id".to_string(), "code-client".to_string()),
            ("redirect_uri".to_string(), "http://example.org/code-cb".to_string()),
            ("response_type".to_string(), "code".to_string()),
            ("scope".to_string(), "config".to_string()),
            ("state".to_string(), "12345".to_string()),
            ("code_challenge_method".to_string(), "plain".to_string()),
        ]);
        let err = AuthorizeRequest::from_params(&params).unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_request_missing_state() {
        let params = Params::from([
            ("client_id".to_string(), "code-client".to_string()),
            ("redirect_uri".to_string(), "http://example.org/code-cb".to_string()),
            ("response_type".to_string(), "code".to_string()),
            ("scope".to_string(), "config".to_string()),
        ]);
        let err = AuthorizeRequest::from_params(&params).unwrap_err();
        assert_eq!(err.description, "missing \"state\" parameter");
    }
}
