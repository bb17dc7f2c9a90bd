//! JSON-file-per-user durable store
//!
//! Each user's snapshot lives in its own document under
//! `{root}/users/{hex(user_id)}.json`. User ids are hex-encoded so any
//! string id maps to a filesystem-safe name. Writes go through a temp
//! file and an atomic rename, which gives read-your-writes consistency
//! within the process without a database dependency.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::memory::types::Snapshot;
use crate::storage::{MemoryStore, StoreError};

/// The on-disk document wrapping one user's snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    user_id: String,
    memories: Snapshot,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// File-backed memory store.
pub struct FileStore {
    users_dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `data_dir`.
    pub fn new(data_dir: &Path) -> Result<Self, StoreError> {
        let users_dir = data_dir.join("users");
        std::fs::create_dir_all(&users_dir).map_err(|e| {
            StoreError::Unavailable(format!(
                "Failed to create store directory {}: {e}",
                users_dir.display()
            ))
        })?;
        tracing::info!("FileStore initialized at {}", users_dir.display());
        Ok(Self { users_dir })
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.users_dir.join(format!("{}.json", hex::encode(user_id)))
    }

    async fn read_document(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        let path = self.path_for(user_id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let doc: UserDocument = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("Failed to decode {}: {e}", path.display())))?;
        Ok(Some(doc))
    }

    async fn write_document(&self, doc: &UserDocument) -> Result<(), StoreError> {
        let path = self.path_for(&doc.user_id);
        let tmp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| StoreError::Corrupt(format!("Failed to encode document: {e}")))?;

        fs::write(&tmp_path, &bytes).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to commit {}: {e}", path.display()))
        })?;

        Ok(())
    }
}

#[async_trait]
impl MemoryStore for FileStore {
    async fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.read_document(user_id).await?.map(|doc| doc.memories))
    }

    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let now = Utc::now();
        // created_at survives across saves; updated_at tracks this one.
        let created_at = self
            .read_document(user_id)
            .await
            .ok()
            .flatten()
            .map(|doc| doc.created_at)
            .unwrap_or(now);

        let doc = UserDocument {
            user_id: user_id.to_string(),
            memories: snapshot.clone(),
            created_at,
            updated_at: now,
        };
        self.write_document(&doc).await?;
        tracing::debug!("Saved {} field(s) for user {user_id}", snapshot.len());
        Ok(())
    }

    async fn delete_field(&self, user_id: &str, field: &str) -> Result<bool, StoreError> {
        let Some(mut doc) = self.read_document(user_id).await? else {
            return Ok(false);
        };

        if doc.memories.remove(field).is_none() {
            return Ok(false);
        }

        doc.updated_at = Utc::now();
        self.write_document(&doc).await?;
        tracing::debug!("Deleted field '{field}' for user {user_id}");
        Ok(true)
    }

    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(user_id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted all memories for user {user_id}");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Unavailable(format!(
                "Failed to delete {}: {e}",
                path.display()
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
