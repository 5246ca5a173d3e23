//! Configuration loading and management

use std::path::Path;

use anyhow::{Context, Result};
use oauth_server::{ClientRegistration, ServerConfig, SignatureKeyPair, StaticClientRegistry};
use serde::{Deserialize, Serialize};

/// Main configuration for the auth service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Token and code lifetimes
    #[serde(default)]
    pub tokens: ServerConfig,

    /// Registered OAuth clients
    #[serde(default)]
    pub clients: Vec<ClientRegistration>,

    /// Ed25519 key pair for signing access tokens (base64 of the 96-byte libsodium
    /// secret key + public key). Tokens carry plain random secrets when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_key_pair: Option<String>,
}

impl Config {
    /// Load configuration from the config directory
    pub fn load(config_path: &str) -> Result<Self> {
        let config_file = Path::new(config_path).join("config.json");

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read config file: {:?}", config_file))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| "Failed to parse config.json")?;
            tracing::info!(
                "Loaded configuration from {:?} ({} clients)",
                config_file,
                config.clients.len()
            );
            Ok(config)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_file
            );
            let config = Config::default();

            // Create config directory if it doesn't exist
            std::fs::create_dir_all(config_path)
                .with_context(|| format!("Failed to create config directory: {}", config_path))?;

            // Write default config for reference
            let content = serde_json::to_string_pretty(&config)?;
            std::fs::write(&config_file, content)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::info!("Created default config at {:?}", config_file);

            Ok(config)
        }
    }

    pub fn registry(&self) -> StaticClientRegistry {
        StaticClientRegistry::new(self.clients.iter().cloned())
    }

    /// Decode the configured signing key pair, if any
    pub fn signing_key(&self) -> Result<Option<SignatureKeyPair>> {
        self.signature_key_pair
            .as_deref()
            .map(|encoded| {
                SignatureKeyPair::from_base64(encoded)
                    .context("Invalid signature_key_pair in config.json")
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth_server::ResponseType;

    #[test]
    fn test_load_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let path = path.to_str().unwrap();

        let config = Config::load(path).unwrap();
        assert!(config.clients.is_empty());
        assert_eq!(config.tokens.access_token_lifetime_secs, 3600);
        assert!(Path::new(path).join("config.json").exists());

        // Second load reads the file back
        let config = Config::load(path).unwrap();
        assert!(config.signing_key().unwrap().is_none());
    }

    #[test]
    fn test_load_clients_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "tokens": { "code_lifetime_secs": 300 },
            "clients": [
                {
                    "client_id": "code-client-secret",
                    "redirect_uri": "http://example.org/code-cb",
                    "response_type": "code",
                    "display_name": "Code Client",
                    "client_secret": "123456"
                }
            ],
            "signature_key_pair": "jq7s7JVBhXk02Nn0Hng4+BNcUlwYOPRR9IXngC51XQDYvQHEgaAvFVHewDvRHtTD5uuVk4cfBbKqT10ckGCJ2Ni9AcSBoC8VUd7AO9Ee1MPm65WThx8FsqpPXRyQYInY"
        }"#;
        std::fs::write(dir.path().join("config.json"), json).unwrap();

        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.tokens.code_lifetime_secs, 300);
        assert_eq!(config.tokens.access_token_lifetime_secs, 3600);
        assert_eq!(config.clients[0].response_type, ResponseType::Code);
        assert_eq!(config.registry().len(), 1);
        assert!(config.signing_key().unwrap().is_some());
    }

    #[test]
    fn test_invalid_signing_key() {
        let config = Config {
            signature_key_pair: Some("bm90IGEga2V5".to_string()),
            ..Config::default()
        };
        assert!(config.signing_key().is_err());
    }
}
