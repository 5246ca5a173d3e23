//! Token endpoint: authorization code exchange with client authentication and PKCE
//! verification.

use constant_time_eq::constant_time_eq;
use serde::Serialize;

use crate::codec::{self, TokenClaims};
use crate::error::{Error, ErrorCode, OAuthError, Result};
use crate::params::{self, Params};
use crate::server::OAuthServer;

pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// Headers sent with every token endpoint response
pub const TOKEN_RESPONSE_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", "application/json"),
    ("Cache-Control", "no-store"),
    ("Pragma", "no-cache"),
];

/// Successful token response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessTokenBody {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Everything the transport needs to write the token endpoint response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: AccessTokenBody,
}

impl TokenResponse {
    fn ok(body: AccessTokenBody) -> Self {
        Self {
            status: 200,
            headers: TOKEN_RESPONSE_HEADERS.to_vec(),
            body,
        }
    }
}

impl OAuthServer {
    /// Exchange an authorization code for an access token.
    ///
    /// `auth_client_id`/`auth_client_secret` are the credentials the client authenticated
    /// with (HTTP Basic), if any.
    pub fn token_exchange(
        &self,
        form: &Params,
        auth_client_id: Option<&str>,
        auth_client_secret: Option<&str>,
    ) -> Result<TokenResponse> {
        self.exchange_code(form, auth_client_id, auth_client_secret)
            .inspect_err(|e| match e {
                Error::OAuth(e) => tracing::warn!("Rejected token request: {}", e),
                e => tracing::error!("Token request failed: {}", e),
            })
    }

    fn exchange_code(
        &self,
        form: &Params,
        auth_client_id: Option<&str>,
        auth_client_secret: Option<&str>,
    ) -> Result<TokenResponse> {
        let grant_type = params::required(form, "grant_type")?;
        if grant_type != GRANT_TYPE_AUTHORIZATION_CODE {
            return Err(OAuthError::new(
                400,
                ErrorCode::UnsupportedGrantType,
                format!("\"grant_type\" must be \"{}\"", GRANT_TYPE_AUTHORIZATION_CODE),
            )
            .into());
        }

        let presented = codec::parse(params::required(form, "code")?)
            .map_err(|_| OAuthError::invalid_grant("malformed \"code\""))?;

        let code = self
            .store
            .get_code(&presented.identifier)?
            .ok_or_else(|| OAuthError::invalid_grant("invalid \"code\""))?;
        let now = self.now();
        if code.is_expired(now) {
            return Err(OAuthError::invalid_grant("expired \"code\"").into());
        }

        if codec::hash_secret(&presented.secret) != code.code_secret_hash {
            return Err(OAuthError::invalid_grant("invalid \"code\"").into());
        }

        if params::required(form, "redirect_uri")? != code.redirect_uri {
            return Err(OAuthError::invalid_grant("\"redirect_uri\" does not match").into());
        }

        let client_id = params::optional(form, "client_id")
            .or(auth_client_id)
            .ok_or_else(|| OAuthError::missing_parameter("client_id"))?;
        if client_id != code.client_id {
            return Err(OAuthError::invalid_client("\"client_id\" does not match").into());
        }

        let confidential = self.authenticate_client(client_id, auth_client_id, auth_client_secret)?;

        // Public clients must prove possession with PKCE. Confidential clients already
        // authenticated, but a verifier they do send is still checked.
        if let Some(challenge) = &code.code_challenge {
            match params::optional(form, "code_verifier") {
                Some(verifier) => {
                    params::check_pkce_value("code_verifier", verifier)?;
                    let computed = codec::challenge_from_verifier(verifier);
                    if !constant_time_eq(computed.as_bytes(), challenge.as_bytes()) {
                        return Err(OAuthError::invalid_grant("invalid \"code_verifier\"").into());
                    }
                }
                None if confidential => {}
                None => {
                    return Err(OAuthError::invalid_grant("missing \"code_verifier\"").into());
                }
            }
        }

        let expires_at = self.access_token_expiry(now)?;

        // Consume last: of two racing exchanges only one gets the record.
        let code = self
            .store
            .consume_code(&code.code_id)?
            .ok_or_else(|| OAuthError::invalid_grant("\"code\" was already used"))?;

        let random_secret = codec::encode_segment(&self.random.get());
        let claims = TokenClaims {
            token_id: &code.code_id,
            client_id: &code.client_id,
            user_id: &code.user_id,
            scope: &code.scope,
            expires_at: expires_at.timestamp(),
        };
        let secret = self.seal_access_token(&claims, random_secret)?;

        tracing::info!(
            "Exchanged authorization code {} for access token (client {})",
            code.code_id,
            code.client_id
        );

        Ok(TokenResponse::ok(AccessTokenBody {
            access_token: codec::render(&code.code_id, &secret),
            token_type: "bearer".to_string(),
            expires_in: self.config.access_token_lifetime_secs,
            scope: self
                .config
                .include_scope_in_token_response
                .then(|| code.scope.clone()),
        }))
    }

    /// Confidential clients must authenticate with exactly their registered credentials.
    /// Returns whether the client is confidential.
    fn authenticate_client(
        &self,
        client_id: &str,
        auth_client_id: Option<&str>,
        auth_client_secret: Option<&str>,
    ) -> std::result::Result<bool, OAuthError> {
        let client = self
            .registry
            .lookup(client_id)
            .ok_or_else(|| OAuthError::invalid_client("client not registered"))?;

        let Some(expected_secret) = &client.client_secret else {
            return Ok(false);
        };

        match (auth_client_id, auth_client_secret) {
            (Some(id), Some(secret)) => {
                if id != client.client_id {
                    return Err(OAuthError::invalid_client(
                        "invalid credentials (client_id mismatch)",
                    ));
                }
                if !constant_time_eq(secret.as_bytes(), expected_secret.as_bytes()) {
                    return Err(OAuthError::invalid_client(
                        "invalid credentials (invalid client_secret)",
                    ));
                }
                Ok(true)
            }
            _ => Err(OAuthError::invalid_client(
                "invalid credentials (no authentication provided)",
            )),
        }
    }
}
