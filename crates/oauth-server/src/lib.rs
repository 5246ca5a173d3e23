//! oauth-server: protocol core of an OAuth 2.0 authorization server.
//!
//! Provides:
//! - Authorization endpoint validation and user decisions (implicit `token` and `code` flows)
//! - Authorization code exchange at the token endpoint
//! - PKCE (S256) and confidential client authentication
//! - Optional Ed25519-signed, self-certifying access tokens
//!
//! Randomness, time, client registrations and code storage are injected so the engines stay
//! deterministic under test. HTTP transport lives elsewhere (see the `auth-service` crate).

pub mod authorize;
pub mod client;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod params;
pub mod random;
pub mod server;
pub mod storage;
pub mod token;

pub use authorize::{Approval, AuthorizeInfo, AuthorizeRequest};
pub use client::{ClientRegistration, ClientRegistry, ResponseType, StaticClientRegistry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::SignatureKeyPair;
pub use config::ServerConfig;
pub use error::{CodecError, ConfigError, Error, ErrorCode, OAuthError, Result, StorageError};
pub use params::Params;
pub use random::{RandomSource, SystemRandom};
pub use server::OAuthServer;
pub use storage::{AuthorizationCode, CodeStorage, CodeStore};
pub use token::{AccessTokenBody, TokenResponse};
