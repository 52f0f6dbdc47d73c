//! Field-level change tracking and merge, shared by every entity type.
//!
//! Each entity type only declares which fields are tracked and how
//! ([`FieldRule`]); the diff/overwrite logic lives once in [`merge`].
//! Fields are compared through their JSON form so one routine covers strings,
//! numbers, dates, enums and sets alike.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ReconcileError;
use crate::types::{Country, EntityType, League, Match, Season, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Incoming non-empty value replaces the existing one
    Replace,
    /// Image-like field: overwritten only when the existing value is empty or
    /// was recorded by the importing provider. The source tag lives in
    /// `source_field` and is set to the provider on write.
    SourceGuarded { source_field: &'static str },
    /// Set-valued field: incoming members are appended, never removed
    Union,
    /// Written once on creation, never changed by a merge
    Immutable,
}

/// Strategy for one entity type
pub trait Reconcilable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;

    fn canonical_id(&self) -> &str;

    fn tracked_fields() -> &'static [(&'static str, FieldRule)];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

pub type ChangeMap = BTreeMap<String, FieldChange>;

#[derive(Debug, Clone)]
pub struct MergeOutcome<T> {
    pub entity: T,
    pub changes: ChangeMap,
    pub is_new: bool,
}

impl<T> MergeOutcome<T> {
    /// A pre-existing entity with no changes needs no write
    pub fn needs_write(&self) -> bool {
        self.is_new || !self.changes.is_empty()
    }
}

fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn to_object<T: Serialize>(entity: &T) -> Result<Map<String, Value>, ReconcileError> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(ReconcileError::Storage(format!(
            "entity did not serialize to an object: {}",
            other
        ))),
    }
}

fn union(old: &Value, new: &Value) -> Value {
    let mut members: Vec<Value> = old.as_array().cloned().unwrap_or_default();
    for v in new.as_array().into_iter().flatten() {
        if !members.contains(v) {
            members.push(v.clone());
        }
    }
    Value::Array(members)
}

/// Merge `incoming` into `existing` on behalf of `provider`.
///
/// Absent `existing`: the incoming entity is taken as-is with `is_new` set and
/// an empty change map. Present: tracked fields are compared and changes
/// recorded as `{field: {old, new}}`. Empty incoming values never clear data.
pub fn merge<T: Reconcilable>(
    existing: Option<T>,
    incoming: T,
    provider: &str,
) -> Result<MergeOutcome<T>, ReconcileError> {
    let Some(existing) = existing else {
        return Ok(MergeOutcome {
            entity: incoming,
            changes: ChangeMap::new(),
            is_new: true,
        });
    };

    let mut merged = to_object(&existing)?;
    let incoming_fields = to_object(&incoming)?;
    let mut changes = ChangeMap::new();

    for (field, rule) in T::tracked_fields() {
        let old = merged.get(*field).cloned().unwrap_or(Value::Null);
        let new = incoming_fields.get(*field).cloned().unwrap_or(Value::Null);

        let next = match rule {
            FieldRule::Immutable => continue,
            FieldRule::Replace => {
                if is_empty_value(&new) {
                    continue;
                }
                new
            }
            FieldRule::Union => union(&old, &new),
            FieldRule::SourceGuarded { source_field } => {
                if is_empty_value(&new) {
                    continue;
                }
                let owner = merged.get(*source_field).and_then(Value::as_str).unwrap_or("");
                if !is_empty_value(&old) && owner != provider {
                    continue;
                }
                if old != new {
                    merged.insert(source_field.to_string(), Value::String(provider.to_string()));
                }
                new
            }
        };

        if next != old {
            merged.insert(field.to_string(), next.clone());
            changes.insert(field.to_string(), FieldChange { old, new: next });
        }
    }

    let entity = if changes.is_empty() {
        existing
    } else {
        serde_json::from_value(Value::Object(merged))?
    };

    Ok(MergeOutcome {
        entity,
        changes,
        is_new: false,
    })
}

impl Reconcilable for Country {
    const ENTITY_TYPE: EntityType = EntityType::Country;

    fn canonical_id(&self) -> &str {
        &self.code
    }

    fn tracked_fields() -> &'static [(&'static str, FieldRule)] {
        &[
            ("name", FieldRule::Replace),
            ("flag", FieldRule::SourceGuarded { source_field: "flag_source" }),
        ]
    }
}

impl Reconcilable for League {
    const ENTITY_TYPE: EntityType = EntityType::League;

    fn canonical_id(&self) -> &str {
        &self.id
    }

    fn tracked_fields() -> &'static [(&'static str, FieldRule)] {
        &[
            ("name", FieldRule::Immutable),
            ("alt_names", FieldRule::Union),
            ("team_countries", FieldRule::Union),
            ("parent_id", FieldRule::Replace),
            ("successor_id", FieldRule::Replace),
            ("logo", FieldRule::SourceGuarded { source_field: "logo_source" }),
        ]
    }
}

impl Reconcilable for Season {
    const ENTITY_TYPE: EntityType = EntityType::Season;

    fn canonical_id(&self) -> &str {
        &self.id
    }

    fn tracked_fields() -> &'static [(&'static str, FieldRule)] {
        &[
            ("year_range", FieldRule::Replace),
            ("start_date", FieldRule::Replace),
            ("end_date", FieldRule::Replace),
        ]
    }
}

impl Reconcilable for Team {
    const ENTITY_TYPE: EntityType = EntityType::Team;

    fn canonical_id(&self) -> &str {
        &self.id
    }

    fn tracked_fields() -> &'static [(&'static str, FieldRule)] {
        &[
            ("alt_names", FieldRule::Union),
            ("logo", FieldRule::SourceGuarded { source_field: "logo_source" }),
        ]
    }
}

impl Reconcilable for Match {
    const ENTITY_TYPE: EntityType = EntityType::Match;

    fn canonical_id(&self) -> &str {
        &self.id
    }

    fn tracked_fields() -> &'static [(&'static str, FieldRule)] {
        &[
            ("status", FieldRule::Replace),
            ("home_score", FieldRule::Replace),
            ("away_score", FieldRule::Replace),
            ("kick_off", FieldRule::Replace),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CountryRef;
    use chrono::{TimeZone, Utc};

    fn team(logo: &str, logo_source: &str) -> Team {
        Team {
            id: "NZL-CRUSADERS".to_string(),
            name: "Crusaders".to_string(),
            country: CountryRef {
                code: "NZL".to_string(),
                name: "New Zealand".to_string(),
            },
            logo: logo.to_string(),
            logo_source: logo_source.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_entity_first_write_wins() {
        let incoming = team("https://a/logo.png", "providerA");
        let outcome = merge(None, incoming.clone(), "providerA").unwrap();
        assert!(outcome.is_new);
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.entity, incoming);
        assert!(outcome.needs_write());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = team("https://a/logo.png", "providerA");
        let mut incoming = team("https://a/logo-v2.png", "providerA");
        incoming.alt_names.insert("Canterbury Crusaders".to_string());

        let first = merge(Some(existing), incoming.clone(), "providerA").unwrap();
        assert_eq!(first.changes.len(), 2);

        let second = merge(Some(first.entity), incoming, "providerA").unwrap();
        assert!(second.changes.is_empty());
        assert!(!second.needs_write());
    }

    #[test]
    fn test_source_guarded_logo() {
        let existing = team("https://a/logo.png", "providerA");

        let incoming = team("https://b/logo.png", "providerB");
        let from_b = merge(Some(existing.clone()), incoming, "providerB").unwrap();
        assert!(from_b.changes.is_empty());
        assert_eq!(from_b.entity.logo, "https://a/logo.png");

        let incoming = team("https://a/new.png", "providerA");
        let from_a = merge(Some(existing), incoming, "providerA").unwrap();
        let change = from_a.changes.get("logo").unwrap();
        assert_eq!(change.old, Value::String("https://a/logo.png".to_string()));
        assert_eq!(change.new, Value::String("https://a/new.png".to_string()));
        assert_eq!(from_a.entity.logo_source, "providerA");
    }

    #[test]
    fn test_empty_logo_can_be_claimed_by_any_source() {
        let existing = team("", "");
        let incoming = team("https://b/logo.png", "providerB");
        let outcome = merge(Some(existing), incoming, "providerB").unwrap();
        assert!(outcome.changes.contains_key("logo"));
        assert_eq!(outcome.entity.logo_source, "providerB");
    }

    #[test]
    fn test_empty_incoming_never_clears() {
        let existing = team("https://a/logo.png", "providerA");
        let outcome = merge(Some(existing.clone()), team("", "providerA"), "providerA").unwrap();
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.entity, existing);
    }

    #[test]
    fn test_alt_names_union() {
        let mut existing = team("", "");
        existing.alt_names.insert("Crusaders Rugby".to_string());
        let mut incoming = team("", "");
        incoming.alt_names.insert("BNZ Crusaders".to_string());

        let outcome = merge(Some(existing), incoming, "rugbydb").unwrap();
        assert_eq!(outcome.entity.alt_names.len(), 2);
        assert!(outcome.changes.contains_key("alt_names"));
    }

    #[test]
    fn test_match_score_update_and_none_kept() {
        let kick_off = Utc.with_ymd_and_hms(2024, 3, 8, 19, 45, 0).unwrap();
        let base = Match {
            id: "M".to_string(),
            season_id: "S".to_string(),
            league_id: "L".to_string(),
            home_team_id: "H".to_string(),
            away_team_id: "A".to_string(),
            home_score: None,
            away_score: None,
            status: crate::types::MatchStatus::Upcoming,
            kick_off,
        };
        let mut finished = base.clone();
        finished.status = crate::types::MatchStatus::Finished;
        finished.home_score = Some(24);
        finished.away_score = Some(17);

        let outcome = merge(Some(base), finished.clone(), "api_sports").unwrap();
        assert_eq!(outcome.changes.len(), 3);
        assert_eq!(outcome.entity.home_score, Some(24));

        // A later payload without scores does not wipe them
        let mut no_scores = finished.clone();
        no_scores.home_score = None;
        no_scores.away_score = None;
        let outcome = merge(Some(outcome.entity), no_scores, "api_sports").unwrap();
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.entity.home_score, Some(24));
    }

    #[test]
    fn test_league_name_is_immutable() {
        let existing = League {
            id: "FRA-TOP-14".to_string(),
            name: "Top 14".to_string(),
            country_code: "FRA".to_string(),
            tier: 1,
            ..Default::default()
        };
        let mut incoming = existing.clone();
        incoming.name = "T14".to_string();
        let outcome = merge(Some(existing), incoming, "rapidapi").unwrap();
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.entity.name, "Top 14");
    }
}
