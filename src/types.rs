//! Canonical catalog entities.
//!
//! Every entity carries a stable internal id derived from its country and
//! normalized name (see [`crate::reconcile::CanonicalIdBuilder`]). Entities are
//! created on first encounter and afterwards only merged, never deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Entity kinds tracked by the catalog and the cross-reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "country")]
    Country,
    #[serde(rename = "league")]
    League,
    #[serde(rename = "league_season")]
    Season,
    #[serde(rename = "team")]
    Team,
    #[serde(rename = "match")]
    Match,
}

impl EntityType {
    /// Import order: every type only depends on types before it
    pub const IMPORT_ORDER: [EntityType; 5] = [
        EntityType::Country,
        EntityType::League,
        EntityType::Season,
        EntityType::Team,
        EntityType::Match,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Country => "country",
            EntityType::League => "league",
            EntityType::Season => "league_season",
            EntityType::Team => "team",
            EntityType::Match => "match",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "country" => Some(EntityType::Country),
            "league" => Some(EntityType::League),
            "league_season" | "season" => Some(EntityType::Season),
            "team" => Some(EntityType::Team),
            "match" => Some(EntityType::Match),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Men,
    Women,
}

impl Gender {
    /// Women's competitions are marked with "(W)" or mention "women" in the name
    pub fn from_name(name: &str) -> Self {
        if name.contains("(W)") || name.to_lowercase().contains("women") {
            Gender::Women
        } else {
            Gender::Men
        }
    }
}

/// Competition structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompetitionFormat {
    #[default]
    League,
    Cup,
    Hybrid,
    Knockout,
    Series,
    Friendly,
    Lineal,
}

impl CompetitionFormat {
    /// Fallback when no static format is known: anything named "cup" is a cup
    pub fn default_for_name(name: &str) -> Self {
        if name.to_lowercase().contains("cup") {
            CompetitionFormat::Cup
        } else {
            CompetitionFormat::League
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Upcoming,
    Live,
    Finished,
}

impl MatchStatus {
    pub fn from_provider(status: &str) -> Self {
        match status.trim() {
            "Finished" => MatchStatus::Finished,
            "In Play" => MatchStatus::Live,
            _ => MatchStatus::Upcoming,
        }
    }
}

/// Country code space: 3-letter codes plus the EUR/OCE/WLD regional buckets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub flag_source: String,
}

/// Denormalized country reference carried by teams
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountryRef {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alt_names: BTreeSet<String>,
    pub country_code: String,
    /// Countries whose teams take part
    #[serde(default)]
    pub team_countries: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub successor_id: Option<String>,
    pub tier: u8,
    pub format: CompetitionFormat,
    #[serde(default)]
    pub phases: Vec<String>,
    pub gender: Gender,
    pub international: bool,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub logo_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    /// `<league id>-SEASON-<year>`
    pub id: String,
    pub league_id: String,
    pub year: i32,
    pub year_range: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alt_names: BTreeSet<String>,
    pub country: CountryRef,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub logo_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// `<season id>-<home id>-<away id>-<YYYYMMDD>`
    pub id: String,
    pub season_id: String,
    pub league_id: String,
    pub home_team_id: String,
    pub away_team_id: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    pub status: MatchStatus,
    pub kick_off: DateTime<Utc>,
}

impl Match {
    pub fn derive_id(
        season_id: &str,
        home_team_id: &str,
        away_team_id: &str,
        kick_off: &DateTime<Utc>,
    ) -> String {
        format!(
            "{}-{}-{}-{}",
            season_id,
            home_team_id,
            away_team_id,
            kick_off.format("%Y%m%d")
        )
    }
}

/// (provider, provider id, entity type) -> internal id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceEntry {
    pub provider: String,
    pub provider_id: String,
    pub entity_type: EntityType,
    pub internal_id: String,
}

impl CrossReferenceEntry {
    pub fn new(
        provider: &str,
        provider_id: &str,
        entity_type: EntityType,
        internal_id: &str,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            provider_id: provider_id.to_string(),
            entity_type,
            internal_id: internal_id.to_string(),
        }
    }
}
