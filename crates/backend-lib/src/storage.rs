// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Credential record storage with in-memory and flat-file implementations.
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

/// File holding one JSON record per line
const RECORDS_FILE: &str = "users.jsonl";

/// Persisted pairing of an identifier and encoded secret material
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: Uuid,
    /// Unique, case-sensitive, stored exactly as submitted
    pub identifier: String,
    /// Interpretation depends on the active storage mode
    pub secret_material: String,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(identifier: impl Into<String>, secret_material: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            secret_material: secret_material.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("secret_material", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Trait for credential storage backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new record. Fails with `DuplicateIdentifier` if the
    /// identifier is taken.
    async fn insert(&self, record: CredentialRecord) -> Result<(), AppError>;

    /// Fetch the record for an exact identifier
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, AppError>;
}

/// Volatile storage, lost on restart
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<DashMap<String, CredentialRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStorage {
    async fn insert(&self, record: CredentialRecord) -> Result<(), AppError> {
        match self.records.entry(record.identifier.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateIdentifier(record.identifier)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            },
        }
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        Ok(self.records.get(identifier).map(|r| r.value().clone()))
    }
}

/// Flat-file implementation of the `CredentialStore` trait
#[derive(Debug, Clone)]
pub struct FlatFileStorage {
    path: PathBuf,
    /// Held exclusively by `insert` for its check-then-append, shared by reads
    lock: Arc<RwLock<()>>,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, AppError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            path: root.join(RECORDS_FILE),
            lock: Arc::new(RwLock::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, AppError> {
        if !tokio_fs::try_exists(&self.path).await? {
            return Ok(String::new());
        }

        // A crash mid-append can leave a partial multi-byte character behind
        let bytes = tokio_fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parse every readable line; damaged lines are logged and skipped
    fn parse_records(&self, content: &str) -> Vec<CredentialRecord> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %err,
                        "skipping unreadable credential record"
                    );
                    None
                },
            })
            .collect()
    }
}

#[async_trait]
impl CredentialStore for FlatFileStorage {
    async fn insert(&self, record: CredentialRecord) -> Result<(), AppError> {
        let _guard = self.lock.write().await;

        let content = self.read_content().await?;
        if self
            .parse_records(&content)
            .iter()
            .any(|r| r.identifier == record.identifier)
        {
            return Err(AppError::DuplicateIdentifier(record.identifier));
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        // Never glue a new record onto a truncated last line
        if !content.is_empty() && !content.ends_with('\n') {
            line.insert(0, '\n');
        }

        let mut file = tokio_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        let _guard = self.lock.read().await;

        let content = self.read_content().await?;
        Ok(self
            .parse_records(&content)
            .into_iter()
            .find(|r| r.identifier == identifier))
    }
}
