//! Save and load whole canvases as registered projects.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use canvas_core::serializer;
use canvas_core::{Canvas, CanvasError, ProjectStats, SerializedProject};

use crate::content::{get_json, put_json, ContentStore};
use crate::error::{Result, StorageError};
use crate::metadata::ProjectMetadata;
use crate::registry::{NftStatus, ProjectRecord, ProjectRegistry};

/// User input for a save.
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub name: String,
    pub description: Option<String>,
    /// Account that creates and initially owns the project.
    pub owner: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SavedProject {
    pub record: ProjectRecord,
    pub metadata: ProjectMetadata,
}

/// Project service - uploads graph snapshots and keeps the registry in step
pub struct ProjectService<C: ContentStore, R: ProjectRegistry> {
    content: Arc<C>,
    registry: Arc<R>,
}

impl<C: ContentStore, R: ProjectRegistry> ProjectService<C, R> {
    pub fn new(content: Arc<C>, registry: Arc<R>) -> Self {
        Self { content, registry }
    }

    /// Upload the canvas and its metadata, then register the project.
    ///
    /// The canvas itself is never modified. A failure at any step aborts the
    /// save; blobs uploaded before the failure are left in the content store.
    pub async fn save(&self, canvas: &Canvas, request: SaveRequest) -> Result<SavedProject> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StorageError::Validation(
                "project name must not be blank".to_string(),
            ));
        }
        let owner = request
            .owner
            .as_deref()
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| StorageError::Validation("an owner is required to save".to_string()))?;
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let document = canvas.export();
        let data_cid = put_json(&*self.content, &format!("{name}.json"), &document).await?;

        let created_at = Utc::now();
        let metadata = ProjectMetadata::build(
            name,
            description.unwrap_or_default(),
            owner,
            data_cid.as_str(),
            self.content.url_for(&data_cid),
            created_at,
        );
        let metadata_cid =
            put_json(&*self.content, &format!("{name}-metadata.json"), &metadata).await?;

        let record = ProjectRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            creator: owner.to_string(),
            owner: owner.to_string(),
            nft_status: NftStatus::Draft,
            data_cid,
            metadata_cid,
            created_at,
        };
        self.registry.create(&record).await?;

        tracing::info!(
            project_id = %record.id,
            data_cid = %record.data_cid,
            total_nodes = document.metadata.total_nodes,
            "ProjectService: project saved"
        );
        Ok(SavedProject { record, metadata })
    }

    /// Replace the canvas contents with a registered project.
    pub async fn load(&self, canvas: &mut Canvas, project_id: Uuid) -> Result<ProjectStats> {
        let record = self.registry.get(project_id).await?;
        let document = self.fetch_document(&record).await?;
        let stats = canvas.import(document)?;

        tracing::info!(
            project_id = %record.id,
            total_nodes = stats.total_nodes,
            "ProjectService: project loaded"
        );
        Ok(stats)
    }

    /// Fetch a record's graph document without touching any canvas.
    pub async fn fetch_document(&self, record: &ProjectRecord) -> Result<SerializedProject> {
        let bytes = self.content.get(&record.data_cid).await?;
        let json = std::str::from_utf8(&bytes).map_err(|e| {
            CanvasError::InvalidDocument(format!("document is not UTF-8: {e}"))
        })?;
        Ok(serializer::from_json(json)?)
    }

    pub async fn fetch_metadata(&self, record: &ProjectRecord) -> Result<ProjectMetadata> {
        get_json(&*self.content, &record.metadata_cid).await
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<ProjectRecord>> {
        self.registry.list_by_owner(owner).await
    }

    pub async fn delete(&self, project_id: Uuid) -> Result<()> {
        self.registry.delete(project_id).await
    }
}
