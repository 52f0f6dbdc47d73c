//! Run report: per-type counters, change records and the failure list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::ReconcileError;
use crate::reconcile::ChangeMap;
use crate::types::EntityType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entity_type: EntityType,
    pub id: String,
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changes: ChangeMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub entity_type: EntityType,
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    /// [`ReconcileError::kind`] label, or "unmatched" for records left for
    /// manual review
    pub kind: String,
    pub reason: String,
}

/// Outcome of one provider's import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub provider: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: BTreeMap<EntityType, EntityStats>,
    pub changes: Vec<ChangeRecord>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            stats: EntityType::IMPORT_ORDER
                .iter()
                .map(|et| (*et, EntityStats::default()))
                .collect(),
            changes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn stats(&self, entity_type: EntityType) -> EntityStats {
        self.stats.get(&entity_type).copied().unwrap_or_default()
    }

    fn stats_mut(&mut self, entity_type: EntityType) -> &mut EntityStats {
        self.stats.entry(entity_type).or_default()
    }

    pub fn record_created(&mut self, entity_type: EntityType, id: &str) {
        self.stats_mut(entity_type).created += 1;
        self.changes.push(ChangeRecord {
            entity_type,
            id: id.to_string(),
            is_new: true,
            changes: ChangeMap::new(),
        });
    }

    pub fn record_updated(&mut self, entity_type: EntityType, id: &str, changes: ChangeMap) {
        self.stats_mut(entity_type).updated += 1;
        self.changes.push(ChangeRecord {
            entity_type,
            id: id.to_string(),
            is_new: false,
            changes,
        });
    }

    pub fn record_unchanged(&mut self, entity_type: EntityType) {
        self.stats_mut(entity_type).unchanged += 1;
    }

    /// Per-entity failure; the record is excluded from persistence
    pub fn record_failure(
        &mut self,
        entity_type: EntityType,
        provider_id: &str,
        name: &str,
        err: &ReconcileError,
    ) {
        self.push_failure(entity_type, provider_id, name, err.kind(), err.to_string());
    }

    /// No match and not eligible for creation; left for manual review
    pub fn record_unmatched(&mut self, entity_type: EntityType, provider_id: &str, name: &str) {
        self.push_failure(
            entity_type,
            provider_id,
            name,
            "unmatched",
            "no matching entity; not in priority list".to_string(),
        );
    }

    /// Cross-reference moved to a different internal id. The entity itself
    /// was still processed, so only the failure list grows.
    pub fn record_conflict(
        &mut self,
        entity_type: EntityType,
        provider_id: &str,
        name: &str,
        err: &ReconcileError,
    ) {
        self.failures.push(Failure {
            entity_type,
            provider: self.provider.clone(),
            provider_id: provider_id.to_string(),
            name: name.to_string(),
            kind: err.kind().to_string(),
            reason: err.to_string(),
        });
    }

    fn push_failure(
        &mut self,
        entity_type: EntityType,
        provider_id: &str,
        name: &str,
        kind: &str,
        reason: String,
    ) {
        self.stats_mut(entity_type).failed += 1;
        self.failures.push(Failure {
            entity_type,
            provider: self.provider.clone(),
            provider_id: provider_id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            reason,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failures_of_kind(&self, kind: &str) -> impl Iterator<Item = &Failure> {
        let kind = kind.to_string();
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    pub fn log_summary(&self) {
        info!("=== Import report: {} ===", self.provider);
        for (entity_type, s) in &self.stats {
            info!(
                "{:<14} created={} updated={} unchanged={} failed={}",
                entity_type.as_str(),
                s.created,
                s.updated,
                s.unchanged,
                s.failed
            );
        }
        if !self.failures.is_empty() {
            warn!("{} records need attention", self.failures.len());
            for f in self.failures.iter().take(20) {
                warn!(
                    "  [{}] {} {}:{} '{}': {}",
                    f.kind, f.entity_type, f.provider, f.provider_id, f.name, f.reason
                );
            }
        }
    }
}

/// Write reports as a JSON array
pub async fn save_reports<P: AsRef<Path>>(
    reports: &[RunReport],
    path: P,
) -> Result<(), ReconcileError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(reports)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| ReconcileError::Storage(format!("failed to write report {:?}: {}", path, e)))?;
    info!("Wrote {} run report(s) to {:?}", reports.len(), path);
    Ok(())
}
