//! Archive manager
//!
//! Soft delete for every entity. Archiving captures the current value of
//! each live path into `archives/{entity}/{id}` and removes the live paths
//! in the same multi-path write; restoring does the reverse. Either the
//! whole unit moves or nothing does.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::data::{
    ArchiveEntry, ArchivedPath, PathWrite, Store, child_path, collections, decode, encode,
    normalize_path,
};
use crate::error::AppError;
use crate::metrics::ARCHIVE_OPERATIONS_TOTAL;

fn entry_path(entity: &str, id: &str) -> Result<String, AppError> {
    if entity.trim().is_empty() || id.trim().is_empty() {
        return Err(AppError::Validation(
            "entity and id are required".to_string(),
        ));
    }
    if entity.contains('/') || id.contains('/') {
        return Err(AppError::Validation(format!(
            "invalid archive key: {}/{}",
            entity, id
        )));
    }
    Ok(child_path(&child_path(collections::ARCHIVES, entity), id))
}

/// Archive service
pub struct ArchiveService {
    store: Arc<dyn Store>,
}

impl ArchiveService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Move live `paths` into a single archive entry
    ///
    /// # Arguments
    /// * `entity` - Entity kind, e.g. "blotter"
    /// * `id` - Record id (resident uid for multi-path units)
    /// * `paths` - Every live path that makes up the record
    /// * `preview` - Summary fields shown in archive listings
    /// * `archived_by` - Staff member performing the deletion
    ///
    /// # Errors
    /// `NotFound` when none of `paths` currently holds data.
    /// `Conflict` when an entry for `entity`/`id` is already archived.
    pub async fn archive_record(
        &self,
        entity: &str,
        id: &str,
        paths: &[String],
        preview: Map<String, Value>,
        archived_by: Option<&str>,
    ) -> Result<ArchiveEntry, AppError> {
        let entry_path = entry_path(entity, id)?;
        if self.store.get(&entry_path).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "{} {} already has an archive entry; restore or purge it first",
                entity, id
            )));
        }

        let mut captured: Vec<ArchivedPath> = Vec::new();
        for path in paths {
            let path = normalize_path(path)?;
            if path.is_empty() || captured.iter().any(|c| c.path == path) {
                continue;
            }
            if let Some(value) = self.store.get(&path).await? {
                captured.push(ArchivedPath { path, value });
            }
        }

        if captured.is_empty() {
            return Err(AppError::not_found(entity, id));
        }

        let entry = ArchiveEntry {
            entity: entity.to_string(),
            id: id.to_string(),
            archived_at: Utc::now(),
            archived_by: archived_by.map(str::to_string),
            paths: captured,
            preview,
        };

        let mut writes = vec![PathWrite::put(entry_path, encode(&entry)?)];
        writes.extend(entry.paths.iter().map(|p| PathWrite::delete(p.path.clone())));
        self.store.write_paths(writes).await?;

        ARCHIVE_OPERATIONS_TOTAL
            .with_label_values(&["archive", entity])
            .inc();
        tracing::info!(
            entity,
            id,
            paths = entry.paths.len(),
            archived_by = ?entry.archived_by,
            "Record archived"
        );

        Ok(entry)
    }

    /// Every archive entry, newest first
    pub async fn get_archived_items(&self) -> Result<Vec<ArchiveEntry>, AppError> {
        let Some(Value::Object(entities)) = self.store.get(collections::ARCHIVES).await? else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        for (entity, node) in entities {
            items.extend(decode_entries(&entity, node));
        }
        sort_newest_first(&mut items);
        Ok(items)
    }

    /// Archive entries for one entity, newest first
    pub async fn get_archived_items_for(&self, entity: &str) -> Result<Vec<ArchiveEntry>, AppError> {
        let path = child_path(collections::ARCHIVES, entity);
        let Some(node) = self.store.get(&path).await? else {
            return Ok(Vec::new());
        };

        let mut items = decode_entries(entity, node);
        sort_newest_first(&mut items);
        Ok(items)
    }

    /// One archive entry
    pub async fn get_archived_item(&self, entity: &str, id: &str) -> Result<ArchiveEntry, AppError> {
        let path = entry_path(entity, id)?;
        let value = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| AppError::not_found("archived item", &format!("{}/{}", entity, id)))?;
        decode(value)
    }

    /// Put every captured path back and drop the entry
    ///
    /// Refused with `Conflict` while any captured path holds live data.
    /// If the write fails nothing changes and the entry stays available
    /// for another attempt.
    pub async fn restore_archived_item(
        &self,
        entity: &str,
        id: &str,
    ) -> Result<ArchiveEntry, AppError> {
        let entry = self.get_archived_item(entity, id).await?;

        for captured in &entry.paths {
            if self.store.get(&captured.path).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "{} is in use; cannot restore {} {}",
                    captured.path, entity, id
                )));
            }
        }

        let mut writes: Vec<PathWrite> = entry
            .paths
            .iter()
            .map(|p| PathWrite::put(p.path.clone(), p.value.clone()))
            .collect();
        writes.push(PathWrite::delete(entry_path(entity, id)?));

        if let Err(error) = self.store.write_paths(writes).await {
            tracing::error!(entity, id, %error, "Restore failed; archive entry kept");
            return Err(error);
        }

        ARCHIVE_OPERATIONS_TOTAL
            .with_label_values(&["restore", entity])
            .inc();
        tracing::info!(entity, id, paths = entry.paths.len(), "Record restored");

        Ok(entry)
    }

    /// Permanently remove an archive entry
    pub async fn delete_archived_item(&self, entity: &str, id: &str) -> Result<(), AppError> {
        let path = entry_path(entity, id)?;
        if self.store.get(&path).await?.is_none() {
            return Err(AppError::not_found(
                "archived item",
                &format!("{}/{}", entity, id),
            ));
        }

        self.store.remove(&path).await?;

        ARCHIVE_OPERATIONS_TOTAL
            .with_label_values(&["purge", entity])
            .inc();
        tracing::info!(entity, id, "Archived record permanently deleted");
        Ok(())
    }
}

fn decode_entries(entity: &str, node: Value) -> Vec<ArchiveEntry> {
    let collection = child_path(collections::ARCHIVES, entity);
    crate::data::decode_children(&collection, Some(node))
}

fn sort_newest_first(items: &mut [ArchiveEntry]) {
    items.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
}
