//! Import run orchestration.
//!
//! One run imports everything a provider offers, in dependency order:
//! countries, leagues, seasons, teams, matches. Leagues are processed one at
//! a time because each new league may be the parent of the next; every other
//! stage reconciles its records concurrently (bounded by `concurrency`).
//! Records converging on one canonical id are merged through
//! [`CatalogStore::update_with`], so neither creates nor updates are lost.
//!
//! A provider fetch that fails after retries aborts the run, as does a
//! storage failure. Everything else is a per-record failure collected into
//! the [`RunReport`].

use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config;
use crate::error::ReconcileError;
use crate::metrics::{Metrics, Timer};
use crate::provider::{
    ProviderCountry, ProviderFetch, ProviderLeague, ProviderMatch, ProviderSeason, ProviderTeam,
};
use crate::reconcile::{
    normalize_country_name, record_alt_name, CanonicalIdBuilder, ChangeMap, FieldChange,
    LeagueIndex, LeagueMatcher, MatchReason, Reconcilable, SeasonNormalizer, TeamMatch,
    TeamMatcher,
};
use crate::report::RunReport;
use crate::store::{list_entities, load_entity, merge_entity, save_entity, CatalogStore};
use crate::tables::StaticTables;
use crate::types::{
    Country, CountryRef, CrossReferenceEntry, EntityType, League, Match, MatchStatus, Season, Team,
};
use crate::xref::XrefWrite;

const MISSING_COUNTRY: &str = "Missing or invalid country data";
const UNMAPPED_COUNTRY: &str = "No country mapping found";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Team names that may be created when nothing in the catalog matches
    pub priority_teams: BTreeSet<String>,
    /// Records reconciled in parallel within a stage
    pub concurrency: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            priority_teams: BTreeSet::new(),
            concurrency: 8,
        }
    }
}

impl ImportOptions {
    pub fn from_env() -> Self {
        Self {
            priority_teams: config::priority_teams_from_env(),
            concurrency: config::import_concurrency(),
        }
    }
}

/// What happened to one record
#[derive(Debug)]
enum Persisted {
    Created(String),
    Updated(String, ChangeMap),
    Unchanged,
    /// No match and not eligible for creation
    Unmatched,
}

#[derive(Debug)]
struct Reconciled {
    persisted: Persisted,
    /// Cross-reference write that moved an existing mapping
    conflict: Option<ReconcileError>,
}

impl Reconciled {
    fn new(persisted: Persisted, conflict: Option<ReconcileError>) -> Self {
        Self { persisted, conflict }
    }
}

#[derive(Debug)]
struct RecordOutcome {
    entity_type: EntityType,
    provider_id: String,
    name: String,
    result: Result<Reconciled, ReconcileError>,
}

impl RecordOutcome {
    fn new(
        entity_type: EntityType,
        provider_id: &str,
        name: &str,
        result: Result<Reconciled, ReconcileError>,
    ) -> Self {
        Self {
            entity_type,
            provider_id: provider_id.to_string(),
            name: name.to_string(),
            result,
        }
    }
}

/// Reports of consecutive provider runs, cut short by the first abort
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub reports: Vec<RunReport>,
    /// Error that aborted the batch; later providers were not run
    pub aborted: Option<ReconcileError>,
}

impl ImportBatch {
    /// Every provider ran to completion
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Season touched by the run, for current-season marking
#[derive(Debug, Clone)]
struct SeasonSeen {
    league_id: String,
    year: i32,
    flagged_current: bool,
}

pub struct Importer {
    store: Arc<dyn CatalogStore>,
    tables: Arc<StaticTables>,
    leagues: LeagueMatcher,
    teams: TeamMatcher,
    seasons: SeasonNormalizer,
    metrics: Arc<Metrics>,
    options: ImportOptions,
}

impl Importer {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        tables: Arc<StaticTables>,
        metrics: Arc<Metrics>,
        options: ImportOptions,
    ) -> Self {
        Self {
            leagues: LeagueMatcher::new(tables.clone()),
            teams: TeamMatcher::new(tables.clone()),
            seasons: SeasonNormalizer::new(tables.clone()),
            store,
            tables,
            metrics,
            options,
        }
    }

    /// Import everything `provider` offers.
    pub async fn run(&self, provider: &dyn ProviderFetch) -> Result<RunReport, ReconcileError> {
        let provider_name = provider.name().to_string();
        let mut report = RunReport::new(&provider_name);
        let timer = Timer::start();
        info!(provider = %provider_name, "Starting import run");

        let countries = provider.countries().await?;
        self.import_countries(&provider_name, countries, &mut report)
            .instrument(info_span!("stage", stage = "countries"))
            .await?;

        let leagues = provider.leagues().await?;
        let index = self
            .import_leagues(&provider_name, leagues, &mut report)
            .instrument(info_span!("stage", stage = "leagues"))
            .await?;

        let seasons = provider.seasons().await?;
        self.import_seasons(&provider_name, seasons, &index, &mut report)
            .instrument(info_span!("stage", stage = "seasons"))
            .await?;

        let teams = provider.teams().await?;
        self.import_teams(&provider_name, teams, &mut report)
            .instrument(info_span!("stage", stage = "teams"))
            .await?;

        let matches = provider.matches().await?;
        self.import_matches(&provider_name, matches, &mut report)
            .instrument(info_span!("stage", stage = "matches"))
            .await?;

        report.finish();
        info!(
            provider = %provider_name,
            changes = report.changes.len(),
            failures = report.failures.len(),
            elapsed_ms = timer.elapsed_ms(),
            "Import run complete"
        );
        Ok(report)
    }

    /// Run `providers` in order. A fatal error stops the batch: nothing after
    /// an aborted provider runs against the partial catalog.
    pub async fn run_all<P: ProviderFetch>(&self, providers: &[P]) -> ImportBatch {
        let mut batch = ImportBatch::default();
        for provider in providers {
            let span = info_span!("import", provider = %provider.name());
            match self.run(provider).instrument(span).await {
                Ok(report) => {
                    report.log_summary();
                    batch.reports.push(report);
                }
                Err(e) => {
                    error!(provider = %provider.name(), "Import aborted: {}", e);
                    batch.aborted = Some(e);
                    break;
                }
            }
        }
        batch
    }

    // === Stages ===

    async fn import_countries(
        &self,
        provider: &str,
        countries: Vec<ProviderCountry>,
        report: &mut RunReport,
    ) -> Result<(), ReconcileError> {
        debug!("Reconciling {} countries", countries.len());
        let outcomes: Vec<RecordOutcome> = stream::iter(countries)
            .map(|pc| async move {
                let result = self.reconcile_country(provider, &pc).await;
                RecordOutcome::new(EntityType::Country, &pc.id, &pc.name, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;
        self.apply_all(report, outcomes)
    }

    /// Sequential: each league may be the parent of a later one.
    async fn import_leagues(
        &self,
        provider: &str,
        leagues: Vec<ProviderLeague>,
        report: &mut RunReport,
    ) -> Result<LeagueIndex, ReconcileError> {
        debug!("Reconciling {} leagues", leagues.len());
        let mut index = LeagueIndex::new(list_entities::<League>(self.store.as_ref()).await?);
        for pl in leagues {
            let result = self.reconcile_league(provider, &pl, &mut index, report).await;
            self.apply(report, RecordOutcome::new(EntityType::League, &pl.id, &pl.name, result))?;
        }
        Ok(index)
    }

    async fn import_seasons(
        &self,
        provider: &str,
        seasons: Vec<ProviderSeason>,
        index: &LeagueIndex,
        report: &mut RunReport,
    ) -> Result<(), ReconcileError> {
        debug!("Reconciling {} seasons", seasons.len());
        let results: Vec<(RecordOutcome, Option<SeasonSeen>)> = stream::iter(seasons)
            .map(|ps| async move {
                let (result, seen) = match self.reconcile_season(provider, &ps, index).await {
                    Ok((reconciled, seen)) => (Ok(reconciled), Some(seen)),
                    Err(e) => (Err(e), None),
                };
                (RecordOutcome::new(EntityType::Season, &ps.id, &ps.label, result), seen)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        let mut seen = Vec::new();
        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, s) in results {
            outcomes.push(outcome);
            seen.extend(s);
        }
        self.apply_all(report, outcomes)?;
        self.mark_current_seasons(&seen, report).await
    }

    async fn import_teams(
        &self,
        provider: &str,
        teams: Vec<ProviderTeam>,
        report: &mut RunReport,
    ) -> Result<(), ReconcileError> {
        debug!("Reconciling {} teams", teams.len());
        let candidates = list_entities::<Team>(self.store.as_ref()).await?;
        let candidates = candidates.as_slice();
        let outcomes: Vec<RecordOutcome> = stream::iter(teams)
            .map(|pt| async move {
                let result = self.reconcile_team(provider, &pt, candidates).await;
                RecordOutcome::new(EntityType::Team, &pt.id, &pt.name, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;
        self.apply_all(report, outcomes)
    }

    async fn import_matches(
        &self,
        provider: &str,
        matches: Vec<ProviderMatch>,
        report: &mut RunReport,
    ) -> Result<(), ReconcileError> {
        debug!("Reconciling {} matches", matches.len());
        let outcomes: Vec<RecordOutcome> = stream::iter(matches)
            .map(|pm| async move {
                let result = self.reconcile_match(provider, &pm).await;
                RecordOutcome::new(EntityType::Match, &pm.id, &pm.id, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;
        self.apply_all(report, outcomes)
    }

    // === Per-record reconciliation ===

    async fn reconcile_country(
        &self,
        provider: &str,
        pc: &ProviderCountry,
    ) -> Result<Reconciled, ReconcileError> {
        let code = pc
            .code
            .as_deref()
            .and_then(|c| self.tables.canonical_country_code(c))
            .or_else(|| self.tables.canonical_country_code(&pc.name))
            .ok_or_else(|| {
                ReconcileError::validation(EntityType::Country, &pc.name, UNMAPPED_COUNTRY)
            })?;

        let flag = pc.flag.clone().unwrap_or_default();
        let incoming = Country {
            name: normalize_country_name(&pc.name, &self.tables.country_aliases),
            flag_source: if flag.is_empty() { String::new() } else { provider.to_string() },
            flag,
            code,
        };

        let (country, persisted) = self.persist(incoming, provider).await?;
        let conflict = self.link(provider, &pc.id, EntityType::Country, &country.code).await?;
        Ok(Reconciled::new(persisted, conflict))
    }

    async fn reconcile_league(
        &self,
        provider: &str,
        pl: &ProviderLeague,
        index: &mut LeagueIndex,
        report: &mut RunReport,
    ) -> Result<Reconciled, ReconcileError> {
        let (matched, write) = self
            .leagues
            .resolve(self.store.as_ref(), provider, &pl.id, &pl.name, index)
            .await?;
        self.metrics.record_league_match(matched.reason);

        let mut conflict = match (&write, &matched.internal_id) {
            (Some(XrefWrite::Updated { previous, remaining }), Some(id)) => Some(self.conflict(
                provider,
                &pl.id,
                EntityType::League,
                previous,
                id,
                remaining,
            )),
            _ => None,
        };

        let fallback_country = pl
            .country_code
            .as_deref()
            .and_then(|c| self.tables.canonical_country_code(c));

        let existing = matched.internal_id.as_deref().and_then(|id| index.get(id)).cloned();
        let mut incoming = match existing {
            Some(league) => league,
            None => {
                let mut blueprint = self
                    .leagues
                    .blueprint(&matched.canonical_name, fallback_country.as_deref(), index);
                if let Some(id) = &matched.internal_id {
                    blueprint.id = id.clone();
                }
                if let Some(parent_name) = &matched.parent {
                    self.ensure_parent(provider, parent_name, &blueprint, index, report)
                        .await?;
                }
                blueprint
            }
        };

        let normalized = self.leagues.normalizer().normalize(&pl.name);
        if normalized != incoming.name {
            incoming.alt_names.insert(normalized);
        }
        if let Some(logo) = pl.logo.as_deref().filter(|l| !l.trim().is_empty()) {
            if incoming.logo.is_empty() {
                incoming.logo_source = provider.to_string();
            }
            incoming.logo = logo.to_string();
        }

        let (league, persisted) = self.persist(incoming, provider).await?;
        if matched.reason != MatchReason::CrossReference && write.is_none() {
            let linked = self.link(provider, &pl.id, EntityType::League, &league.id).await?;
            conflict = conflict.or(linked);
        }
        index.insert(league);
        Ok(Reconciled::new(persisted, conflict))
    }

    /// Create a registered parent league the first time one of its children
    /// shows up.
    async fn ensure_parent(
        &self,
        provider: &str,
        parent_name: &str,
        child: &League,
        index: &mut LeagueIndex,
        report: &mut RunReport,
    ) -> Result<(), ReconcileError> {
        let Some(parent_id) = child.parent_id.as_deref() else {
            return Ok(());
        };
        if index.get(parent_id).is_some() {
            return Ok(());
        }
        let mut parent = self.leagues.blueprint(parent_name, Some(&child.country_code), index);
        parent.id = parent_id.to_string();
        let (parent, persisted) = self.persist(parent, provider).await?;
        if let Persisted::Created(id) = &persisted {
            info!(league = %id, child = %child.name, "Created parent league");
            self.metrics.entities_created.inc();
            report.record_created(EntityType::League, id);
        }
        index.insert(parent);
        Ok(())
    }

    async fn reconcile_season(
        &self,
        provider: &str,
        ps: &ProviderSeason,
        index: &LeagueIndex,
    ) -> Result<(Reconciled, SeasonSeen), ReconcileError> {
        let league_id = self
            .store
            .get_cross_reference(provider, &ps.league_id, EntityType::League)
            .await?
            .ok_or_else(|| ReconcileError::not_found(EntityType::League, &ps.league_id))?;
        let league = match index.get(&league_id) {
            Some(league) => league.clone(),
            None => load_entity::<League>(self.store.as_ref(), &league_id)
                .await?
                .ok_or_else(|| ReconcileError::not_found(EntityType::League, &league_id))?,
        };

        let key = self.seasons.normalize(&league.name, &ps.label)?;
        let seen = SeasonSeen {
            league_id: league.id.clone(),
            year: key.internal_year,
            flagged_current: ps.current,
        };
        let (season, persisted) = self.persist(key.into_season(&league.id), provider).await?;
        let conflict = self.link(provider, &ps.id, EntityType::Season, &season.id).await?;
        Ok((Reconciled::new(persisted, conflict), seen))
    }

    async fn reconcile_team(
        &self,
        provider: &str,
        pt: &ProviderTeam,
        candidates: &[Team],
    ) -> Result<Reconciled, ReconcileError> {
        let name = pt.name.trim();

        if let Some(id) = self
            .store
            .get_cross_reference(provider, &pt.id, EntityType::Team)
            .await?
        {
            self.metrics.xref_hits.inc();
            let team = match candidates.iter().find(|t| t.id == id) {
                Some(team) => team.clone(),
                None => load_entity::<Team>(self.store.as_ref(), &id)
                    .await?
                    .ok_or_else(|| ReconcileError::not_found(EntityType::Team, &id))?,
            };
            return self.update_team(provider, pt, team).await;
        }

        let raw_code = pt
            .country_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ReconcileError::validation(EntityType::Team, name, MISSING_COUNTRY))?;
        let code = self
            .tables
            .canonical_country_code(raw_code)
            .ok_or_else(|| ReconcileError::validation(EntityType::Team, name, UNMAPPED_COUNTRY))?;
        let country_name = self.country_name(pt, &code).await?;

        match self.teams.match_team(name, &country_name, candidates) {
            TeamMatch::Matched { team_id, via, .. } => {
                self.metrics.record_team_match(via);
                let team = candidates
                    .iter()
                    .find(|t| t.id == team_id)
                    .cloned()
                    .ok_or_else(|| ReconcileError::not_found(EntityType::Team, &team_id))?;
                self.update_team(provider, pt, team).await
            }
            TeamMatch::StrictNoMatch => {
                self.metrics.strict_rejections.inc();
                Err(ReconcileError::AmbiguousMatch { name: name.to_string() })
            }
            TeamMatch::NoMatch => {
                self.metrics.no_matches.inc();
                if !self.options.priority_teams.contains(name) {
                    debug!(
                        provider,
                        provider_id = %pt.id,
                        team = name,
                        "unmatched team left for review"
                    );
                    return Ok(Reconciled::new(Persisted::Unmatched, None));
                }
                let logo = pt.logo.clone().unwrap_or_default();
                let incoming = Team {
                    id: CanonicalIdBuilder::build(&code, name),
                    name: name.to_string(),
                    alt_names: BTreeSet::new(),
                    country: CountryRef {
                        code,
                        name: country_name,
                    },
                    logo_source: if logo.is_empty() { String::new() } else { provider.to_string() },
                    logo,
                };
                let (team, persisted) = self.persist(incoming, provider).await?;
                let conflict = self.link(provider, &pt.id, EntityType::Team, &team.id).await?;
                Ok(Reconciled::new(persisted, conflict))
            }
        }
    }

    /// Record the incoming spelling and logo on a matched team
    async fn update_team(
        &self,
        provider: &str,
        pt: &ProviderTeam,
        team: Team,
    ) -> Result<Reconciled, ReconcileError> {
        let mut incoming = team;
        record_alt_name(&mut incoming, pt.name.trim());
        if let Some(logo) = pt.logo.as_deref().filter(|l| !l.trim().is_empty()) {
            incoming.logo = logo.to_string();
        }
        let (team, persisted) = self.persist(incoming, provider).await?;
        let conflict = self.link(provider, &pt.id, EntityType::Team, &team.id).await?;
        Ok(Reconciled::new(persisted, conflict))
    }

    /// Display name of the team's country: provider-supplied if present,
    /// else the catalog's country record, else the code itself.
    async fn country_name(&self, pt: &ProviderTeam, code: &str) -> Result<String, ReconcileError> {
        if let Some(name) = pt.country_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Ok(normalize_country_name(name, &self.tables.country_aliases));
        }
        Ok(load_entity::<Country>(self.store.as_ref(), code)
            .await?
            .map_or_else(|| code.to_string(), |c| c.name))
    }

    async fn reconcile_match(
        &self,
        provider: &str,
        pm: &ProviderMatch,
    ) -> Result<Reconciled, ReconcileError> {
        let season_id = self.resolve_xref(provider, &pm.season_id, EntityType::Season).await?;
        let home_team_id = self.resolve_xref(provider, &pm.home_team_id, EntityType::Team).await?;
        let away_team_id = self.resolve_xref(provider, &pm.away_team_id, EntityType::Team).await?;
        let season = load_entity::<Season>(self.store.as_ref(), &season_id)
            .await?
            .ok_or_else(|| ReconcileError::not_found(EntityType::Season, &season_id))?;

        let incoming = Match {
            id: Match::derive_id(&season_id, &home_team_id, &away_team_id, &pm.kick_off),
            league_id: season.league_id,
            season_id,
            home_team_id,
            away_team_id,
            home_score: pm.home_score,
            away_score: pm.away_score,
            status: MatchStatus::from_provider(&pm.status),
            kick_off: pm.kick_off,
        };
        let (matched, persisted) = self.persist(incoming, provider).await?;
        let conflict = self.link(provider, &pm.id, EntityType::Match, &matched.id).await?;
        Ok(Reconciled::new(persisted, conflict))
    }

    // === Current season ===

    /// Per league touched by this run: the newest season the provider flagged
    /// current wins, else the newest season overall. Every other season of
    /// the league is cleared.
    async fn mark_current_seasons(
        &self,
        seen: &[SeasonSeen],
        report: &mut RunReport,
    ) -> Result<(), ReconcileError> {
        let mut flagged: BTreeMap<&str, Option<i32>> = BTreeMap::new();
        for s in seen {
            let entry = flagged.entry(s.league_id.as_str()).or_insert(None);
            if s.flagged_current {
                *entry = Some(entry.map_or(s.year, |y| y.max(s.year)));
            }
        }
        if flagged.is_empty() {
            return Ok(());
        }

        let all = list_entities::<Season>(self.store.as_ref()).await?;
        for (league_id, flagged_year) in flagged {
            let league_seasons: Vec<&Season> =
                all.iter().filter(|s| s.league_id == league_id).collect();
            let newest = league_seasons.iter().map(|s| s.year).max();
            let Some(current_year) = flagged_year.or(newest) else {
                continue;
            };

            for season in league_seasons {
                let should_be_current = season.year == current_year;
                if season.current == should_be_current {
                    continue;
                }
                let mut updated = season.clone();
                updated.current = should_be_current;
                save_entity(self.store.as_ref(), &updated).await?;

                let mut changes = ChangeMap::new();
                changes.insert(
                    "current".to_string(),
                    FieldChange {
                        old: serde_json::Value::Bool(season.current),
                        new: serde_json::Value::Bool(should_be_current),
                    },
                );
                debug!(
                    season = %season.id,
                    current = should_be_current,
                    "current season flag changed"
                );
                report.record_updated(EntityType::Season, &season.id, changes);
            }
        }
        Ok(())
    }

    // === Persistence helpers ===

    /// Merge `incoming` into whatever the store holds under its canonical id,
    /// creating it if absent. The read, merge and write happen as one store
    /// operation, so concurrent records for one entity all land.
    async fn persist<T: Reconcilable>(
        &self,
        incoming: T,
        provider: &str,
    ) -> Result<(T, Persisted), ReconcileError> {
        let outcome = merge_entity(self.store.as_ref(), incoming, provider).await?;
        let id = outcome.entity.canonical_id().to_string();
        let persisted = if outcome.is_new {
            Persisted::Created(id)
        } else if outcome.needs_write() {
            Persisted::Updated(id, outcome.changes)
        } else {
            Persisted::Unchanged
        };
        Ok((outcome.entity, persisted))
    }

    async fn resolve_xref(
        &self,
        provider: &str,
        provider_id: &str,
        entity_type: EntityType,
    ) -> Result<String, ReconcileError> {
        self.store
            .get_cross_reference(provider, provider_id, entity_type)
            .await?
            .ok_or_else(|| {
                ReconcileError::not_found(entity_type, &format!("{}:{}", provider, provider_id))
            })
    }

    /// Upsert the cross-reference; a moved mapping comes back as a conflict
    /// to report (the new value is kept).
    async fn link(
        &self,
        provider: &str,
        provider_id: &str,
        entity_type: EntityType,
        internal_id: &str,
    ) -> Result<Option<ReconcileError>, ReconcileError> {
        let entry = CrossReferenceEntry::new(provider, provider_id, entity_type, internal_id);
        match self.store.upsert_cross_reference(&entry).await? {
            XrefWrite::Updated { previous, remaining } => Ok(Some(self.conflict(
                provider,
                provider_id,
                entity_type,
                &previous,
                internal_id,
                &remaining,
            ))),
            XrefWrite::Inserted | XrefWrite::Unchanged => Ok(None),
        }
    }

    /// `remaining` are the other (provider, provider id) pairs still mapped
    /// onto `existing` after the move.
    fn conflict(
        &self,
        provider: &str,
        provider_id: &str,
        entity_type: EntityType,
        existing: &str,
        attempted: &str,
        remaining: &[(String, String)],
    ) -> ReconcileError {
        self.metrics.xref_conflicts.inc();
        let remaining: Vec<String> = remaining
            .iter()
            .map(|(provider, id)| format!("{}:{}", provider, id))
            .collect();
        warn!(
            provider,
            provider_id,
            entity_type = %entity_type,
            existing,
            attempted,
            remaining = remaining.len(),
            "cross-reference moved to a different internal id"
        );
        ReconcileError::MappingConflict {
            provider: provider.to_string(),
            provider_id: provider_id.to_string(),
            entity_type,
            existing: existing.to_string(),
            attempted: attempted.to_string(),
            remaining,
        }
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    // === Report bookkeeping ===

    fn apply_all(
        &self,
        report: &mut RunReport,
        outcomes: Vec<RecordOutcome>,
    ) -> Result<(), ReconcileError> {
        for outcome in outcomes {
            self.apply(report, outcome)?;
        }
        Ok(())
    }

    /// Fold one record into the report. Fatal errors abort the run.
    fn apply(&self, report: &mut RunReport, outcome: RecordOutcome) -> Result<(), ReconcileError> {
        let RecordOutcome {
            entity_type,
            provider_id,
            name,
            result,
        } = outcome;

        let reconciled = match result {
            Ok(reconciled) => reconciled,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(
                    entity_type = %entity_type,
                    provider_id = %provider_id,
                    "record failed: {}",
                    err
                );
                report.record_failure(entity_type, &provider_id, &name, &err);
                return Ok(());
            }
        };

        if let Some(conflict) = &reconciled.conflict {
            report.record_conflict(entity_type, &provider_id, &name, conflict);
        }

        match reconciled.persisted {
            Persisted::Created(id) => {
                self.metrics.entities_created.inc();
                report.record_created(entity_type, &id);
            }
            Persisted::Updated(id, changes) => {
                self.metrics.entities_updated.inc();
                report.record_updated(entity_type, &id, changes);
            }
            Persisted::Unchanged => {
                self.metrics.entities_unchanged.inc();
                report.record_unchanged(entity_type);
            }
            Persisted::Unmatched => report.record_unmatched(entity_type, &provider_id, &name),
        }
        Ok(())
    }
}
