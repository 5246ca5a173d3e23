//! Error types for the authorization server core.
//!
//! Protocol failures (the client sent something we reject) are [`OAuthError`]s and carry the
//! HTTP status, the RFC 6749 error code and a human readable description. Everything else
//! (storage faults, bad key material) is a separate kind so callers can tell a bad request
//! apart from a broken service.

use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// RFC 6749 error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    UnsupportedGrantType,
    InvalidScope,
    ServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::InvalidClient => "invalid_client",
            ErrorCode::InvalidGrant => "invalid_grant",
            ErrorCode::UnauthorizedClient => "unauthorized_client",
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::UnsupportedResponseType => "unsupported_response_type",
            ErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            ErrorCode::InvalidScope => "invalid_scope",
            ErrorCode::ServerError => "server_error",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// A protocol-level rejection of the current request.
///
/// Serializes to the flat JSON error body of RFC 6749 section 5.2; the status is not part of
/// the body.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{error} ({status}): {description}")]
pub struct OAuthError {
    #[serde(skip)]
    pub status: u16,
    pub error: ErrorCode,
    #[serde(rename = "error_description")]
    pub description: String,
}

impl OAuthError {
    pub fn new(status: u16, error: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            status,
            error,
            description: description.into(),
        }
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(400, ErrorCode::InvalidRequest, description)
    }

    /// `missing "<name>" parameter`
    pub fn missing_parameter(name: &str) -> Self {
        Self::invalid_request(format!("missing \"{}\" parameter", name))
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(400, ErrorCode::InvalidGrant, description)
    }

    /// Client authentication failures at the token endpoint are 401.
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(401, ErrorCode::InvalidClient, description)
    }
}

/// Failures of the credential store. Never caused by client input.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Authorization code already exists: {0}")]
    DuplicateCode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Failures of the token codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed credential: expected \"identifier.secret\"")]
    Malformed,

    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Invalid signature key pair: {0}")]
    InvalidKeyPair(String),

    #[error("Signature verification failed")]
    BadSignature,

    #[error("Payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Invalid server settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} of {secs} seconds is out of range")]
    LifetimeOutOfRange { field: &'static str, secs: u64 },
}

/// Any failure surfaced by the server operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// The protocol error, if this is one.
    pub fn as_oauth(&self) -> Option<&OAuthError> {
        match self {
            Error::OAuth(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
