//! Credential store for pending authorization codes.
//!
//! Codes live in memory and are optionally mirrored to `codes.json` in a directory so they
//! survive a restart within their (short) lifetime. Only the hash of a code's secret is ever
//! stored.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

type Result<T> = std::result::Result<T, StorageError>;

/// A pending authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// Lookup key, reused as the identifier of the access token it is exchanged for
    pub code_id: String,
    pub code_secret_hash: String,
    pub user_id: String,
    pub client_id: String,
    pub scope: String,
    pub redirect_uri: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// S256 PKCE challenge, if the authorization request carried one
    pub code_challenge: Option<String>,
}

impl AuthorizationCode {
    /// A code is no longer valid once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Logical operations the engines need from a credential store.
///
/// `consume_code` must be atomic: of several concurrent calls for the same `code_id`, exactly
/// one gets the record.
pub trait CodeStore: Send + Sync {
    /// Persist a new code. Fails rather than overwrite an existing `code_id`.
    fn store_code(&self, code: AuthorizationCode) -> Result<()>;

    /// Pure lookup. Does not check expiry.
    fn get_code(&self, code_id: &str) -> Result<Option<AuthorizationCode>>;

    /// Remove and return the code, if it is still present.
    fn consume_code(&self, code_id: &str) -> Result<Option<AuthorizationCode>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AuthCodeFile {
    /// Maps code_id -> code data
    codes: HashMap<String, AuthorizationCode>,
}

/// In-memory code storage with optional JSON file persistence
pub struct CodeStorage {
    /// Directory holding `codes.json`; `None` for memory-only storage
    data_path: Option<PathBuf>,
    codes: RwLock<AuthCodeFile>,
}

impl CodeStorage {
    /// Memory-only storage
    pub fn in_memory() -> Self {
        Self {
            data_path: None,
            codes: RwLock::new(AuthCodeFile::default()),
        }
    }

    /// Storage persisted under `data_path`. Call [`CodeStorage::init`] before use.
    pub fn open(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: Some(data_path.into()),
            codes: RwLock::new(AuthCodeFile::default()),
        }
    }

    /// Create the backing directory and load any persisted codes.
    ///
    /// Idempotent: calling it again reloads the same file, and a missing file is written
    /// empty so the layout can be verified on disk.
    pub fn init(&self) -> Result<()> {
        let Some(dir) = &self.data_path else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;

        let path = self.codes_path(dir);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let store: AuthCodeFile = serde_json::from_str(&content)?;
            let count = store.codes.len();
            *self.write()? = store;
            tracing::info!("Loaded {} pending authorization codes", count);
        } else {
            self.persist(&*self.write()?)?;
            tracing::info!("Created code storage at {:?}", path);
        }
        Ok(())
    }

    /// Number of stored codes, expired ones included
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.codes.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop codes that have expired at `now`. Returns how many were removed.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut store = self.write()?;
        let before = store.codes.len();
        store.codes.retain(|_, c| !c.is_expired(now));
        let removed = before - store.codes.len();
        if removed > 0 {
            tracing::info!("Cleaned up {} expired authorization codes", removed);
            self.persist(&store)?;
        }
        Ok(removed)
    }

    // --- Persistence ---

    fn codes_path(&self, dir: &std::path::Path) -> PathBuf {
        dir.join("codes.json")
    }

    /// Write `store` to `codes.json` via temp file + rename. Callers hold the write guard, so
    /// snapshots reach the disk in the order they were taken.
    fn persist(&self, store: &AuthCodeFile) -> Result<()> {
        let Some(dir) = &self.data_path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(store)?;
        let path = self.codes_path(dir);
        let temp_path = path.with_extension("json.tmp");

        if let Err(e) = std::fs::write(&temp_path, content) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, AuthCodeFile>> {
        self.codes.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, AuthCodeFile>> {
        self.codes.write().map_err(|_| StorageError::Poisoned)
    }
}

impl CodeStore for CodeStorage {
    fn store_code(&self, code: AuthorizationCode) -> Result<()> {
        let mut store = self.write()?;
        if store.codes.contains_key(&code.code_id) {
            return Err(StorageError::DuplicateCode(code.code_id));
        }
        let code_id = code.code_id.clone();
        store.codes.insert(code_id.clone(), code);
        if let Err(e) = self.persist(&store) {
            store.codes.remove(&code_id);
            return Err(e);
        }
        Ok(())
    }

    fn get_code(&self, code_id: &str) -> Result<Option<AuthorizationCode>> {
        Ok(self.read()?.codes.get(code_id).cloned())
    }

    fn consume_code(&self, code_id: &str) -> Result<Option<AuthorizationCode>> {
        let mut store = self.write()?;
        let Some(code) = store.codes.remove(code_id) else {
            return Ok(None);
        };
        // Not consumed unless the removal reached the disk too.
        if let Err(e) = self.persist(&store) {
            store.codes.insert(code.code_id.clone(), code);
            return Err(e);
        }
        Ok(Some(code))
    }
}
