//! Storage collaborator.
//!
//! The engine only talks to [`CatalogStore`]. Entities cross the boundary as
//! JSON values keyed by canonical id, so the trait stays object-safe; the
//! typed helpers below convert through [`Reconcilable`].
//!
//! [`MemoryStore`] is the bundled implementation: a tokio `RwLock` around
//! per-type maps plus the cross-reference table, persisted as a JSON snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::reconcile::merge::{merge, MergeOutcome, Reconcilable};
use crate::types::{CrossReferenceEntry, EntityType};
use crate::xref::{CrossReferenceTable, XrefWrite};

/// Read-modify-write step for [`CatalogStore::update_with`]. Receives the
/// stored value (if any) and returns the value to write, or `None` to leave
/// the row as it is.
pub type UpdateFn<'a> =
    Box<dyn FnOnce(Option<Value>) -> Result<Option<Value>, ReconcileError> + Send + 'a>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_by_canonical_id(
        &self,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Option<Value>, ReconcileError>;

    /// Insert or replace
    async fn upsert(
        &self,
        entity_type: EntityType,
        id: &str,
        entity: Value,
    ) -> Result<(), ReconcileError>;

    /// Atomic read-modify-write of one row. No other write to `id` may land
    /// between the read handed to `update` and the write of its result; this
    /// is what makes concurrent creates and merges on one entity safe.
    async fn update_with(
        &self,
        entity_type: EntityType,
        id: &str,
        update: UpdateFn<'_>,
    ) -> Result<(), ReconcileError>;

    async fn list(&self, entity_type: EntityType) -> Result<Vec<Value>, ReconcileError>;

    async fn get_cross_reference(
        &self,
        provider: &str,
        provider_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<String>, ReconcileError>;

    /// Idempotent; a write on an existing triple moves it
    async fn upsert_cross_reference(
        &self,
        entry: &CrossReferenceEntry,
    ) -> Result<XrefWrite, ReconcileError>;
}

pub async fn load_entity<T: Reconcilable>(
    store: &dyn CatalogStore,
    id: &str,
) -> Result<Option<T>, ReconcileError> {
    match store.get_by_canonical_id(T::ENTITY_TYPE, id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save_entity<T: Reconcilable>(
    store: &dyn CatalogStore,
    entity: &T,
) -> Result<(), ReconcileError> {
    let value = serde_json::to_value(entity)?;
    store.upsert(T::ENTITY_TYPE, entity.canonical_id(), value).await
}

/// Merge `incoming` into the stored row with the same canonical id inside
/// one [`CatalogStore::update_with`] call. Creates the row when absent and
/// writes only when the merge changed something.
pub async fn merge_entity<T: Reconcilable>(
    store: &dyn CatalogStore,
    incoming: T,
    provider: &str,
) -> Result<MergeOutcome<T>, ReconcileError> {
    let id = incoming.canonical_id().to_string();
    let mut outcome = None;
    let slot = &mut outcome;
    store
        .update_with(
            T::ENTITY_TYPE,
            &id,
            Box::new(move |current| {
                let existing = current.map(serde_json::from_value::<T>).transpose()?;
                let merged = merge(existing, incoming, provider)?;
                let write = if merged.needs_write() {
                    Some(serde_json::to_value(&merged.entity)?)
                } else {
                    None
                };
                *slot = Some(merged);
                Ok(write)
            }),
        )
        .await?;
    outcome.ok_or_else(|| {
        ReconcileError::Storage(format!("{} {} update was never applied", T::ENTITY_TYPE, id))
    })
}

pub async fn list_entities<T: Reconcilable>(
    store: &dyn CatalogStore,
) -> Result<Vec<T>, ReconcileError> {
    store
        .list(T::ENTITY_TYPE)
        .await?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(ReconcileError::from))
        .collect()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    entities: BTreeMap<EntityType, BTreeMap<String, Value>>,
    #[serde(default)]
    cross_references: CrossReferenceTable,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot. A missing file is an empty catalog; an unreadable or
    /// corrupt one is a storage error (the run must not start from a blank
    /// catalog by accident).
    pub async fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ReconcileError> {
        let path = path.as_ref();
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No catalog snapshot found at {:?}, starting empty", path);
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(ReconcileError::Storage(format!(
                    "failed to read catalog snapshot {:?}: {}",
                    path, e
                )))
            }
        };
        let snapshot: Snapshot = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse catalog snapshot {:?}: {}", path, e);
            ReconcileError::Storage(format!("corrupt catalog snapshot {:?}: {}", path, e))
        })?;
        debug!(
            entity_types = snapshot.entities.len(),
            cross_references = snapshot.cross_references.len(),
            "Loaded catalog snapshot"
        );
        Ok(Self {
            inner: RwLock::new(snapshot),
        })
    }

    /// Write the snapshot through a temp file and rename.
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ReconcileError> {
        let path = path.as_ref();
        let json = {
            let snapshot = self.inner.read().await;
            serde_json::to_string_pretty(&*snapshot)?
        };
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| {
                ReconcileError::Storage(format!("failed to write {:?}: {}", tmp_path, e))
            })?;
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            ReconcileError::Storage(format!("failed to move snapshot to {:?}: {}", path, e))
        })?;
        Ok(())
    }

    pub async fn count(&self, entity_type: EntityType) -> usize {
        self.inner
            .read()
            .await
            .entities
            .get(&entity_type)
            .map_or(0, |m| m.len())
    }

    pub async fn cross_reference_entries(&self) -> Vec<CrossReferenceEntry> {
        self.inner.read().await.cross_references.entries()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_by_canonical_id(
        &self,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Option<Value>, ReconcileError> {
        let snapshot = self.inner.read().await;
        Ok(snapshot.entities.get(&entity_type).and_then(|m| m.get(id)).cloned())
    }

    async fn upsert(
        &self,
        entity_type: EntityType,
        id: &str,
        entity: Value,
    ) -> Result<(), ReconcileError> {
        let mut snapshot = self.inner.write().await;
        snapshot
            .entities
            .entry(entity_type)
            .or_default()
            .insert(id.to_string(), entity);
        Ok(())
    }

    /// Holds the write lock across the read and the write.
    async fn update_with(
        &self,
        entity_type: EntityType,
        id: &str,
        update: UpdateFn<'_>,
    ) -> Result<(), ReconcileError> {
        let mut snapshot = self.inner.write().await;
        let table = snapshot.entities.entry(entity_type).or_default();
        if let Some(value) = update(table.get(id).cloned())? {
            table.insert(id.to_string(), value);
        }
        Ok(())
    }

    async fn list(&self, entity_type: EntityType) -> Result<Vec<Value>, ReconcileError> {
        let snapshot = self.inner.read().await;
        Ok(snapshot
            .entities
            .get(&entity_type)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_cross_reference(
        &self,
        provider: &str,
        provider_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<String>, ReconcileError> {
        let snapshot = self.inner.read().await;
        Ok(snapshot
            .cross_references
            .get(provider, provider_id, entity_type)
            .map(str::to_string))
    }

    async fn upsert_cross_reference(
        &self,
        entry: &CrossReferenceEntry,
    ) -> Result<XrefWrite, ReconcileError> {
        let mut snapshot = self.inner.write().await;
        Ok(snapshot.cross_references.upsert(entry))
    }
}
