//! Cross-reference table between provider identifiers and internal ids.
//!
//! Keys are `(provider, entity type, provider id)` triples, each resolving to
//! exactly one internal id. Many triples may point at the same internal id, so
//! the reverse index is N:1 and is rebuilt from the forward map on load.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::{CrossReferenceEntry, EntityType};

/// Snapshot formats, newest first
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CrossReferenceFormat {
    /// V2: `{"forward": {"provider:entity_type:provider_id": "internal_id"}}`
    V2 {
        #[serde(deserialize_with = "deserialize_boxed_map")]
        forward: FxHashMap<Box<str>, Box<str>>,
    },
    /// V1: flat rows as exported from the relational mapping table
    V1 { mappings: Vec<CrossReferenceEntry> },
}

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrefWrite {
    Inserted,
    Unchanged,
    /// Triple already existed with a different internal id. `remaining` lists
    /// the (provider, provider id) pairs still mapped onto `previous`.
    Updated {
        previous: String,
        remaining: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(from = "CrossReferenceFormat")]
pub struct CrossReferenceTable {
    #[serde(serialize_with = "serialize_boxed_map")]
    forward: FxHashMap<Box<str>, Box<str>>,
    /// "entity_type:internal_id" -> forward keys pointing at it
    #[serde(skip)]
    reverse: FxHashMap<Box<str>, Vec<Box<str>>>,
}

impl From<CrossReferenceFormat> for CrossReferenceTable {
    fn from(format: CrossReferenceFormat) -> Self {
        let mut table = match format {
            CrossReferenceFormat::V2 { forward } => {
                tracing::debug!("Loaded cross-reference table (v2 format)");
                Self {
                    forward,
                    reverse: FxHashMap::default(),
                }
            }
            CrossReferenceFormat::V1 { mappings } => {
                tracing::debug!(
                    "Loaded cross-reference table (v1 row format), migrating {} rows",
                    mappings.len()
                );
                let forward = mappings
                    .iter()
                    .map(|e| {
                        (
                            forward_key(&e.provider, e.entity_type, &e.provider_id),
                            e.internal_id.as_str().into(),
                        )
                    })
                    .collect();
                Self {
                    forward,
                    reverse: FxHashMap::default(),
                }
            }
        };
        table.rebuild_reverse();
        table
    }
}

fn serialize_boxed_map<S>(
    map: &FxHashMap<Box<str>, Box<str>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    // Sorted so snapshots diff cleanly
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    let mut ser_map = serializer.serialize_map(Some(entries.len()))?;
    for (k, v) in entries {
        ser_map.serialize_entry(k.as_ref(), v.as_ref())?;
    }
    ser_map.end()
}

fn deserialize_boxed_map<'de, D>(deserializer: D) -> Result<FxHashMap<Box<str>, Box<str>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: std::collections::HashMap<String, String> =
        std::collections::HashMap::deserialize(deserializer)?;
    Ok(string_map
        .into_iter()
        .map(|(k, v)| (k.into_boxed_str(), v.into_boxed_str()))
        .collect())
}

/// Provider names are case-insensitive, provider ids are not.
fn forward_key(provider: &str, entity_type: EntityType, provider_id: &str) -> Box<str> {
    let provider = provider.to_ascii_lowercase();
    let entity = entity_type.as_str();
    let mut key = String::with_capacity(provider.len() + entity.len() + provider_id.len() + 2);
    key.push_str(&provider);
    key.push(':');
    key.push_str(entity);
    key.push(':');
    key.push_str(provider_id);
    key.into()
}

fn reverse_key(entity_type: EntityType, internal_id: &str) -> Box<str> {
    format!("{}:{}", entity_type.as_str(), internal_id).into()
}

fn parse_forward_key(key: &str) -> Option<(&str, EntityType, &str)> {
    let mut parts = key.splitn(3, ':');
    let provider = parts.next()?;
    let entity_type = EntityType::parse(parts.next()?)?;
    let provider_id = parts.next()?;
    Some((provider, entity_type, provider_id))
}

impl CrossReferenceTable {
    pub fn get(&self, provider: &str, provider_id: &str, entity_type: EntityType) -> Option<&str> {
        self.forward
            .get(&forward_key(provider, entity_type, provider_id))
            .map(|s| s.as_ref())
    }

    /// Insert or move a triple. Never errors: a changed target is applied and
    /// reported as [`XrefWrite::Updated`] so the caller can surface it.
    pub fn upsert(&mut self, entry: &CrossReferenceEntry) -> XrefWrite {
        let key = forward_key(&entry.provider, entry.entity_type, &entry.provider_id);
        let previous = self
            .forward
            .insert(key.clone(), entry.internal_id.as_str().into());

        match previous {
            None => {
                self.index(key, entry.entity_type, &entry.internal_id);
                XrefWrite::Inserted
            }
            Some(prev) if prev.as_ref() == entry.internal_id => XrefWrite::Unchanged,
            Some(prev) => {
                if let Some(keys) = self.reverse.get_mut(&reverse_key(entry.entity_type, &prev)) {
                    keys.retain(|k| *k != key);
                }
                self.index(key, entry.entity_type, &entry.internal_id);
                XrefWrite::Updated {
                    remaining: self.provider_ids_for(entry.entity_type, &prev),
                    previous: prev.to_string(),
                }
            }
        }
    }

    /// All (provider, provider id) pairs mapped onto one internal entity
    pub fn provider_ids_for(
        &self,
        entity_type: EntityType,
        internal_id: &str,
    ) -> Vec<(String, String)> {
        self.reverse
            .get(&reverse_key(entity_type, internal_id))
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| parse_forward_key(k))
                    .map(|(provider, _, id)| (provider.to_string(), id.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entries(&self) -> Vec<CrossReferenceEntry> {
        let mut entries: Vec<CrossReferenceEntry> = self
            .forward
            .iter()
            .filter_map(|(k, v)| {
                parse_forward_key(k).map(|(provider, entity_type, provider_id)| {
                    CrossReferenceEntry::new(provider, provider_id, entity_type, v)
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.entity_type, &a.provider, &a.provider_id).cmp(&(
                b.entity_type,
                &b.provider,
                &b.provider_id,
            ))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    fn index(&mut self, key: Box<str>, entity_type: EntityType, internal_id: &str) {
        self.reverse
            .entry(reverse_key(entity_type, internal_id))
            .or_default()
            .push(key);
    }

    fn rebuild_reverse(&mut self) {
        self.reverse.clear();
        self.reverse.reserve(self.forward.len());
        let pairs: Vec<(Box<str>, EntityType, Box<str>)> = self
            .forward
            .iter()
            .filter_map(|(k, v)| {
                parse_forward_key(k).map(|(_, et, _)| (k.clone(), et, v.clone()))
            })
            .collect();
        for (key, entity_type, internal_id) in pairs {
            self.index(key, entity_type, &internal_id);
        }
    }
}
