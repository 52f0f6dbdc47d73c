//! League identity resolution and new-league blueprints.
//!
//! Resolution order: cross-reference table, then the normalized name against
//! the registry (stored leagues plus the static league table), then the
//! alt-name tables. A miss carries the parent league (if the name is a
//! registered child) so the caller can build the new record by inheritance.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::normalize::{CanonicalIdBuilder, NameNormalizer};
use crate::error::ReconcileError;
use crate::store::CatalogStore;
use crate::tables::StaticTables;
use crate::types::{CompetitionFormat, CrossReferenceEntry, EntityType, Gender, League};
use crate::xref::XrefWrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    DirectMatch,
    AltNameMatch,
    CrossReference,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueMatch {
    /// Resolved internal id; `None` on a miss or when the canonical league is
    /// only known by name
    pub internal_id: Option<String>,
    /// Normalized (and, for alt-name hits, canonicalized) name
    pub canonical_name: String,
    pub reason: MatchReason,
    /// Parent league name for registered child competitions
    pub parent: Option<String>,
}

/// Name -> id lookup over leagues already in the catalog
#[derive(Debug, Default, Clone)]
pub struct LeagueIndex {
    by_name: FxHashMap<String, String>,
    /// Lowercased alternate names
    by_alt_name: FxHashMap<String, String>,
    leagues: FxHashMap<String, League>,
}

impl LeagueIndex {
    pub fn new(leagues: impl IntoIterator<Item = League>) -> Self {
        let mut index = Self::default();
        for league in leagues {
            index.insert(league);
        }
        index
    }

    pub fn insert(&mut self, league: League) {
        self.by_name.insert(league.name.clone(), league.id.clone());
        for alt in &league.alt_names {
            self.by_alt_name
                .entry(alt.to_lowercase())
                .or_insert_with(|| league.id.clone());
        }
        self.leagues.insert(league.id.clone(), league);
    }

    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn id_for_alt_name(&self, name: &str) -> Option<&str> {
        self.by_alt_name.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&League> {
        self.leagues.get(id)
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LeagueMatcher {
    tables: Arc<StaticTables>,
    normalizer: NameNormalizer,
}

impl LeagueMatcher {
    pub fn new(tables: Arc<StaticTables>) -> Self {
        let normalizer = NameNormalizer::new(tables.clone());
        Self { tables, normalizer }
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    /// Id of a league known by canonical name, either stored or derivable
    /// from the static registry
    fn registry_id(&self, name: &str, index: &LeagueIndex) -> Option<String> {
        if let Some(id) = index.id_for_name(name) {
            return Some(id.to_string());
        }
        self.tables
            .leagues
            .get(name)
            .map(|info| CanonicalIdBuilder::build(&info.country, name))
    }

    pub fn match_name(&self, provider_name: &str, index: &LeagueIndex) -> LeagueMatch {
        let name = self.normalizer.normalize(provider_name);

        if let Some(id) = self.registry_id(&name, index) {
            return LeagueMatch {
                internal_id: Some(id),
                canonical_name: name,
                reason: MatchReason::DirectMatch,
                parent: None,
            };
        }

        for (canonical, aliases) in &self.tables.league_alt_names {
            if aliases.iter().any(|alias| alias.eq_ignore_ascii_case(&name)) {
                return LeagueMatch {
                    internal_id: self.registry_id(canonical, index),
                    canonical_name: canonical.clone(),
                    reason: MatchReason::AltNameMatch,
                    parent: None,
                };
            }
        }

        if let Some(id) = index.id_for_alt_name(&name) {
            let canonical_name = index.get(id).map_or_else(|| name.clone(), |l| l.name.clone());
            return LeagueMatch {
                internal_id: Some(id.to_string()),
                canonical_name,
                reason: MatchReason::AltNameMatch,
                parent: None,
            };
        }

        LeagueMatch {
            internal_id: None,
            parent: self.tables.league_parents.get(&name).cloned(),
            canonical_name: name,
            reason: MatchReason::NoMatch,
        }
    }

    /// Cross-reference short-circuit, then name matching. Successful name
    /// matches with a resolved id are written back to the cross-reference
    /// table so the next import of `provider_id` skips matching.
    pub async fn resolve(
        &self,
        store: &dyn CatalogStore,
        provider: &str,
        provider_id: &str,
        provider_name: &str,
        index: &LeagueIndex,
    ) -> Result<(LeagueMatch, Option<XrefWrite>), ReconcileError> {
        if let Some(id) = store
            .get_cross_reference(provider, provider_id, EntityType::League)
            .await?
        {
            let canonical_name = index
                .get(&id)
                .map_or_else(|| self.normalizer.normalize(provider_name), |l| l.name.clone());
            debug!(provider, provider_id, league = %id, "league resolved via cross-reference");
            return Ok((
                LeagueMatch {
                    internal_id: Some(id),
                    canonical_name,
                    reason: MatchReason::CrossReference,
                    parent: None,
                },
                None,
            ));
        }

        let matched = self.match_name(provider_name, index);
        let write = match (&matched.internal_id, matched.reason) {
            (Some(id), MatchReason::DirectMatch | MatchReason::AltNameMatch) => {
                let entry = CrossReferenceEntry::new(provider, provider_id, EntityType::League, id);
                Some(store.upsert_cross_reference(&entry).await?)
            }
            _ => None,
        };
        debug!(
            provider,
            provider_id,
            name = provider_name,
            reason = ?matched.reason,
            "league matched by name"
        );
        Ok((matched, write))
    }

    /// New league record for a canonical name, from static metadata where
    /// known and defaults otherwise. `fallback_country` is used when the
    /// registry does not know the league.
    ///
    /// Registered children get `parent_id` and inherit the parent's format,
    /// phases and team countries.
    pub fn blueprint(
        &self,
        canonical_name: &str,
        fallback_country: Option<&str>,
        index: &LeagueIndex,
    ) -> League {
        let mut league = self.base_blueprint(canonical_name, fallback_country);

        if let Some(parent_name) = self.tables.league_parents.get(canonical_name) {
            let parent = self
                .registry_id(parent_name, index)
                .and_then(|id| index.get(&id).cloned())
                .unwrap_or_else(|| self.base_blueprint(parent_name, Some(&league.country_code)));
            inherit_from_parent(&mut league, &parent);
        }

        league
    }

    fn base_blueprint(&self, name: &str, fallback_country: Option<&str>) -> League {
        let info = self.tables.leagues.get(name);
        let international = self.tables.international.contains(name);
        let country_code = info
            .map(|i| i.country.clone())
            .or_else(|| fallback_country.map(str::to_string))
            .unwrap_or_else(|| if international { "WLD" } else { "EUR" }.to_string());

        let (format, phases) = match self.tables.league_formats.get(name) {
            Some(entry) => (entry.format, entry.phases.clone()),
            None => (CompetitionFormat::default_for_name(name), Vec::new()),
        };

        League {
            id: CanonicalIdBuilder::build(&country_code, name),
            name: name.to_string(),
            alt_names: self
                .tables
                .league_alt_names
                .get(name)
                .map(|aliases| aliases.iter().cloned().collect())
                .unwrap_or_default(),
            team_countries: info.map(|i| i.team_countries.clone()).unwrap_or_default(),
            parent_id: None,
            successor_id: self
                .tables
                .league_successors
                .get(name)
                .map(|s| s.successor_id.clone()),
            tier: self.tables.league_tiers.get(name).copied().unwrap_or(1),
            format,
            phases,
            gender: Gender::from_name(name),
            international,
            logo: String::new(),
            logo_source: String::new(),
            country_code,
        }
    }
}

fn inherit_from_parent(league: &mut League, parent: &League) {
    league.parent_id = Some(parent.id.clone());
    league.format = parent.format;
    league.phases = parent.phases.clone();
    if league.team_countries.is_empty() {
        league.team_countries = parent.team_countries.clone();
    }
}
