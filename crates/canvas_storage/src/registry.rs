//! Project registry trait and implementations

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::content::ContentId;
use crate::error::{Result, StorageError};

/// Lifecycle of a project as a tradeable token.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NftStatus {
    #[default]
    Draft,
    Minted,
    Listed,
    Sold,
    Delisted,
}

/// A saved project as registered with the registry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub creator: String,
    pub owner: String,
    pub nft_status: NftStatus,
    /// Content id of the serialized graph.
    pub data_cid: ContentId,
    pub metadata_cid: ContentId,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Register a new record
    async fn create(&self, record: &ProjectRecord) -> Result<()>;

    /// Load a record by id
    async fn get(&self, id: Uuid) -> Result<ProjectRecord>;

    /// All records owned by `owner`, newest first
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<ProjectRecord>>;

    /// Remove a record; removing an unknown id is not an error
    async fn delete(&self, id: Uuid) -> Result<()>;
}

fn newest_first(records: &mut [ProjectRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// One JSON file per record.
#[derive(Clone)]
pub struct FileProjectRegistry {
    base_path: PathBuf,
}

impl FileProjectRegistry {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }
}

#[async_trait]
impl ProjectRegistry for FileProjectRegistry {
    async fn create(&self, record: &ProjectRecord) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self.record_path(record.id);
        if path.exists() {
            return Err(StorageError::Validation(format!(
                "project {} already registered",
                record.id
            )));
        }
        let contents = serde_json::to_string_pretty(record)?;
        fs::write(&path, contents).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<ProjectRecord> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StorageError::ProjectNotFound(id.to_string()));
        }
        let contents = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<ProjectRecord>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<ProjectRecord>(&contents) {
                Ok(record) if record.owner == owner => records.push(record),
                Ok(_) => {}
                Err(error) => tracing::warn!(
                    path = %path.display(),
                    %error,
                    "FileProjectRegistry: skipping unreadable record"
                ),
            }
        }
        newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProjectRegistry {
    records: DashMap<Uuid, ProjectRecord>,
}

impl InMemoryProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRegistry for InMemoryProjectRegistry {
    async fn create(&self, record: &ProjectRecord) -> Result<()> {
        if self.records.contains_key(&record.id) {
            return Err(StorageError::Validation(format!(
                "project {} already registered",
                record.id
            )));
        }
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<ProjectRecord> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::ProjectNotFound(id.to_string()))
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<ProjectRecord>> {
        let mut records: Vec<ProjectRecord> = self
            .records
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.records.remove(&id);
        Ok(())
    }
}
