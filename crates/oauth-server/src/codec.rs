//! Token codec: the `identifier.secret` credential format, secret hashing, PKCE and
//! Ed25519 signing of self-certifying access tokens.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use ring::signature::{self, Ed25519KeyPair, KeyPair, UnparsedPublicKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::CodecError;
use crate::random::RandomSource;

type Result<T> = std::result::Result<T, CodecError>;

const SIGNATURE_LEN: usize = 64;
const SEED_LEN: usize = 32;
const PUBLIC_KEY_LEN: usize = 32;
/// libsodium layout: 64-byte secret key (seed || public key) followed by the public key
const KEY_PAIR_LEN: usize = 96;

/// A credential split into its two wire segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub identifier: String,
    pub secret: String,
}

impl Credential {
    /// `identifier.secret`
    pub fn render(&self) -> String {
        render(&self.identifier, &self.secret)
    }
}

/// Encode opaque bytes as a URL-safe text segment (unpadded base64url).
pub fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Draw a fresh identifier and secret, each from its own random value.
pub fn generate_pair(random: &dyn RandomSource) -> Credential {
    let identifier = encode_segment(&random.get());
    let secret = encode_segment(&random.get());
    Credential { identifier, secret }
}

/// Join the two parts with a literal `.`.
pub fn render(identifier: &str, secret_or_signature: &str) -> String {
    format!("{}.{}", identifier, secret_or_signature)
}

/// Split a presented credential. Both segments must be non-empty and there must be exactly
/// one separator.
pub fn parse(credential: &str) -> Result<Credential> {
    let (identifier, secret) = credential.split_once('.').ok_or(CodecError::Malformed)?;
    if identifier.is_empty() || secret.is_empty() || secret.contains('.') {
        return Err(CodecError::Malformed);
    }
    Ok(Credential {
        identifier: identifier.to_string(),
        secret: secret.to_string(),
    })
}

/// One-way transform used for stored comparison of secrets.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// PKCE S256: `BASE64URL(SHA256(ASCII(code_verifier)))`
pub fn challenge_from_verifier(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// The fields of an access token covered by its signature.
///
/// Field order is part of the wire format: verifiers rebuild this exact JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenClaims<'a> {
    pub token_id: &'a str,
    pub client_id: &'a str,
    pub user_id: &'a str,
    pub scope: &'a str,
    /// Unix seconds
    pub expires_at: i64,
}

impl TokenClaims<'_> {
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Ed25519 key pair used to sign access tokens.
pub struct SignatureKeyPair {
    key_pair: Ed25519KeyPair,
}

impl std::fmt::Debug for SignatureKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureKeyPair")
            .field("public_key", &encode_segment(self.public_key()))
            .finish_non_exhaustive()
    }
}

impl SignatureKeyPair {
    /// Parse a 96-byte libsodium key pair (secret key followed by public key).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_PAIR_LEN {
            return Err(CodecError::InvalidKeyPair(format!(
                "expected {} bytes, got {}",
                KEY_PAIR_LEN,
                bytes.len()
            )));
        }
        let seed = &bytes[..SEED_LEN];
        let public_key = &bytes[KEY_PAIR_LEN - PUBLIC_KEY_LEN..];
        let key_pair = Ed25519KeyPair::from_seed_and_public_key(seed, public_key)
            .map_err(|e| CodecError::InvalidKeyPair(e.to_string()))?;
        Ok(Self { key_pair })
    }

    /// Parse the standard base64 form used in configuration files.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_bytes(&STANDARD.decode(encoded.trim())?)
    }

    pub fn public_key(&self) -> &[u8] {
        self.key_pair.public_key().as_ref()
    }
}

/// Sign `payload`. Returns the text segment `base64url(signature || payload)`.
pub fn sign(payload: &[u8], key_pair: &SignatureKeyPair) -> String {
    let sig = key_pair.key_pair.sign(payload);
    let mut signed = Vec::with_capacity(SIGNATURE_LEN + payload.len());
    signed.extend_from_slice(sig.as_ref());
    signed.extend_from_slice(payload);
    encode_segment(&signed)
}

/// Verify a signed segment and return the payload it carries.
pub fn open(signed: &str, public_key: &[u8]) -> Result<Vec<u8>> {
    let bytes = URL_SAFE_NO_PAD.decode(signed)?;
    if bytes.len() < SIGNATURE_LEN {
        return Err(CodecError::BadSignature);
    }
    let (sig, payload) = bytes.split_at(SIGNATURE_LEN);
    UnparsedPublicKey::new(&signature::ED25519, public_key)
        .verify(payload, sig)
        .map_err(|_| CodecError::BadSignature)?;
    Ok(payload.to_vec())
}

/// Check that `signed` is a valid signature over exactly `payload`.
pub fn verify(payload: &[u8], signed: &str, public_key: &[u8]) -> bool {
    matches!(open(signed, public_key), Ok(embedded) if embedded == payload)
}
