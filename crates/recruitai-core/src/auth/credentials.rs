//! Persistent storage for the access/refresh token pair.
//!
//! Stores are dumb holders: they do no validation and report every failure
//! to the caller. Only the refresh coordinator writes to them.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AuthResponse;

/// Credentials file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "recruitai";

const ACCESS_TOKEN_KEY: &str = "accessToken";
const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt credential file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Access and refresh token. An empty string means the token is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }
}

impl From<AuthResponse> for Credentials {
    fn from(auth: AuthResponse) -> Self {
        Self {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
        }
    }
}

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Credentials, StorageError>;

    fn set(&self, credentials: &Credentials) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    /// When the stored credentials were last written, if the backend tracks it
    fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(None)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<(Credentials, DateTime<Utc>)>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: Mutex::new(Some((credentials, Utc::now()))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Credentials, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.as_ref().map(|(c, _)| c.clone()).unwrap_or_default())
    }

    fn set(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *inner = Some((credentials.clone(), Utc::now()));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *inner = None;
        Ok(())
    }

    fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.as_ref().map(|(_, at)| *at))
    }
}

// ============================================================================
// File store
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    #[serde(flatten)]
    credentials: Credentials,
    updated_at: DateTime<Utc>,
}

/// Credentials persisted as JSON in the application data directory.
pub struct FileCredentialStore {
    data_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    fn load(&self) -> Result<Option<CredentialFile>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Credentials, StorageError> {
        Ok(self.load()?.map(|f| f.credentials).unwrap_or_default())
    }

    fn set(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CredentialFile {
            credentials: credentials.clone(),
            updated_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        write_private(&path, &contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.load()?.map(|f| f.updated_at))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

// ============================================================================
// OS keychain store
// ============================================================================

/// Credentials kept in the OS keychain, one entry per token.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn read(&self, key: &str) -> Result<String, StorageError> {
        let entry = Entry::new(&self.service, key)?;
        match entry.get_password() {
            Ok(value) => Ok(value),
            Err(keyring::Error::NoEntry) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if value.is_empty() {
            return self.delete(key);
        }
        Entry::new(&self.service, key)?.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let entry = Entry::new(&self.service, key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Result<Credentials, StorageError> {
        Ok(Credentials {
            access_token: self.read(ACCESS_TOKEN_KEY)?,
            refresh_token: self.read(REFRESH_TOKEN_KEY)?,
        })
    }

    fn set(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.write(ACCESS_TOKEN_KEY, &credentials.access_token)?;
        self.write(REFRESH_TOKEN_KEY, &credentials.refresh_token)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.delete(ACCESS_TOKEN_KEY)?;
        self.delete(REFRESH_TOKEN_KEY)
    }
}
