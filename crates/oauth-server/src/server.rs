//! The authorization server and its injected collaborators.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::client::ClientRegistry;
use crate::clock::Clock;
use crate::codec::{self, SignatureKeyPair, TokenClaims};
use crate::config::{self, ServerConfig};
use crate::error::{ConfigError, Result};
use crate::random::RandomSource;
use crate::storage::CodeStore;

/// OAuth 2.0 authorization server core.
///
/// Stateless between calls apart from the code store. The authorize operations live in
/// [`crate::authorize`], the token endpoint in [`crate::token`].
pub struct OAuthServer {
    pub(crate) store: Arc<dyn CodeStore>,
    pub(crate) random: Box<dyn RandomSource>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) registry: Box<dyn ClientRegistry>,
    pub(crate) signature_key_pair: Option<SignatureKeyPair>,
    pub(crate) config: ServerConfig,
}

impl OAuthServer {
    pub fn new(
        store: Arc<dyn CodeStore>,
        random: impl RandomSource + 'static,
        clock: impl Clock + 'static,
        registry: impl ClientRegistry + 'static,
    ) -> Self {
        Self {
            store,
            random: Box::new(random),
            clock: Box::new(clock),
            registry: Box::new(registry),
            signature_key_pair: None,
            config: ServerConfig::default(),
        }
    }

    /// Sign access tokens instead of handing out plain random secrets.
    pub fn with_signature_key_pair(mut self, key_pair: SignatureKeyPair) -> Self {
        self.signature_key_pair = Some(key_pair);
        self
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Public half of the signing key, for handing to token verifiers.
    pub fn public_key(&self) -> Option<&[u8]> {
        self.signature_key_pair.as_ref().map(|k| k.public_key())
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn access_token_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        expiry(
            now,
            "access_token_lifetime_secs",
            self.config.access_token_lifetime_secs,
        )
    }

    pub(crate) fn code_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        expiry(now, "code_lifetime_secs", self.config.code_lifetime_secs)
    }

    /// Second segment of an access token: the random secret as is, or a signature over the
    /// token's claims when a key pair is configured.
    pub(crate) fn seal_access_token(
        &self,
        claims: &TokenClaims<'_>,
        random_secret: String,
    ) -> Result<String> {
        match &self.signature_key_pair {
            Some(key_pair) => Ok(codec::sign(&claims.to_payload()?, key_pair)),
            None => Ok(random_secret),
        }
    }
}

fn expiry(now: DateTime<Utc>, field: &'static str, secs: u64) -> Result<DateTime<Utc>> {
    config::check_lifetime(field, secs)?;
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| ConfigError::LifetimeOutOfRange { field, secs }.into())
}
