//! Fixture-based tests for the reconciliation core.
//!
//! Builds catalog entities from plain fixture data and drives the matchers,
//! season normalization and merge through the public API only.

use chrono::NaiveDate;
use std::sync::Arc;

use catalog_reconciler::reconcile::{
    merge, CanonicalIdBuilder, LeagueIndex, LeagueMatcher, MatchReason, MatchVia, NameNormalizer,
    SeasonNormalizer, SuffixClassifier, TeamMatch, TeamMatcher,
};
use catalog_reconciler::tables::StaticTables;
use catalog_reconciler::types::{CountryRef, Team};

fn tables() -> Arc<StaticTables> {
    Arc::new(StaticTables::builtin())
}

/// Catalog team owned by `country` (display name), id derived from `code`
fn make_team(code: &str, country: &str, name: &str) -> Team {
    Team {
        id: CanonicalIdBuilder::build(code, name),
        name: name.to_string(),
        country: CountryRef {
            code: code.to_string(),
            name: country.to_string(),
        },
        ..Default::default()
    }
}

fn make_logo_team(logo: &str, source: &str) -> Team {
    Team {
        logo: logo.to_string(),
        logo_source: source.to_string(),
        ..make_team("NZL", "New Zealand", "Crusaders")
    }
}

fn matched_id(result: &TeamMatch) -> Option<&str> {
    match result {
        TeamMatch::Matched { team_id, .. } => Some(team_id),
        _ => None,
    }
}

// =============================================================================
// NAMES AND IDS
// =============================================================================

#[test]
fn test_canonical_id_is_deterministic() {
    let a = CanonicalIdBuilder::build("IRL", "St. Mary's College");
    let b = CanonicalIdBuilder::build("IRL", "St. Mary's College");
    assert_eq!(a, b);
    assert_eq!(a, "IRL-ST-MARYS-COLLEGE");
}

#[test]
fn test_normalizer_is_idempotent() {
    let normalizer = NameNormalizer::new(tables());
    for raw in ["Top 14 (2024-25)", "Guinness Pro14", "Heineken Cup", "  Currie Cup  ", "T14"] {
        let once = normalizer.normalize(raw);
        assert_eq!(normalizer.normalize(&once), once, "not idempotent for {:?}", raw);
    }
}

#[test]
fn test_normalizer_keeps_casing() {
    let normalizer = NameNormalizer::new(tables());
    assert_eq!(normalizer.normalize("Shute shield (2023)"), "Shute shield");
}

// =============================================================================
// TEAM MATCHING
// =============================================================================

#[test]
fn test_suffix_incompatibility_blocks_match() {
    let matcher = TeamMatcher::new(tables());
    let pool = vec![make_team("NZL", "New Zealand", "Crusaders Women")];
    assert_eq!(
        matcher.match_team("Crusaders", "New Zealand", &pool),
        TeamMatch::NoMatch
    );
}

#[test]
fn test_gender_marker_class_matches() {
    let matcher = TeamMatcher::new(tables());
    let pool = vec![make_team("NZL", "New Zealand", "Crusaders Women")];
    let result = matcher.match_team("Crusaders (W)", "New Zealand", &pool);
    assert_eq!(matched_id(&result), Some("NZL-CRUSADERS-WOMEN"));
    if let TeamMatch::Matched { via, alt_name, .. } = result {
        assert_eq!(via, MatchVia::Heuristic);
        assert_eq!(alt_name.as_deref(), Some("Crusaders (W)"));
    }
}

#[test]
fn test_directional_opposites_block_match() {
    let matcher = TeamMatcher::new(tables());
    let pool = vec![make_team("NZL", "New Zealand", "Southern Knights")];
    assert_eq!(
        matcher.match_team("Northern Knights", "New Zealand", &pool),
        TeamMatch::NoMatch
    );
}

#[test]
fn test_nickname_short_circuit() {
    let matcher = TeamMatcher::new(tables());
    let pool = vec![
        make_team("NZL", "New Zealand", "New Zealand Māori"),
        make_team("NZL", "New Zealand", "New Zealand XV"),
        make_team("NZL", "New Zealand", "All Blacks"),
    ];
    let result = matcher.match_team("New Zealand", "New Zealand", &pool);
    assert_eq!(matched_id(&result), Some("NZL-ALL-BLACKS"));
    assert!(matches!(result, TeamMatch::Matched { via: MatchVia::Nickname, .. }));
}

#[test]
fn test_strict_match_team_fails_closed() {
    let matcher = TeamMatcher::new(tables());
    let pool = vec![make_team("WAL", "Wales", "Cardiff Met")];
    assert_eq!(
        matcher.match_team("Cardiff", "Wales", &pool),
        TeamMatch::StrictNoMatch
    );

    let pool = vec![make_team("WAL", "Wales", "Cardiff Rugby")];
    assert_eq!(
        matched_id(&matcher.match_team("Cardiff", "Wales", &pool)),
        Some("WAL-CARDIFF-RUGBY")
    );
}

#[test]
fn test_country_narrowing_tolerates_hyphens() {
    let matcher = TeamMatcher::new(tables());
    let pool = vec![
        make_team("SAM", "Samoa", "Moana Pasifika"),
        make_team("NZL", "New Zealand", "Moana Pasifika"),
    ];
    let result = matcher.match_team("moana pasifika", "New-Zealand", &pool);
    assert_eq!(matched_id(&result), Some("NZL-MOANA-PASIFIKA"));
}

#[test]
fn test_suffix_classifier_classes() {
    let suffixes = SuffixClassifier::new(&StaticTables::builtin());
    assert_eq!(suffixes.class_of("Ireland U20"), suffixes.class_of("Ireland Under 20"));
    assert!(suffixes.class_of("Ireland").is_none());
    assert!(!suffixes.compatible("Ireland U20", "Ireland W"));
    assert!(suffixes.compatible("Munster", "Leinster"));
}

// =============================================================================
// LEAGUE MATCHING
// =============================================================================

#[test]
fn test_league_resolution_reasons() {
    let matcher = LeagueMatcher::new(tables());
    let index = LeagueIndex::default();

    let direct = matcher.match_name("Premiership Rugby (2023-24)", &index);
    assert_eq!(direct.reason, MatchReason::DirectMatch);
    assert_eq!(direct.internal_id.as_deref(), Some("ENG-PREMIERSHIP-RUGBY"));

    let alt = matcher.match_name("Tri Nations", &index);
    assert_eq!(alt.reason, MatchReason::AltNameMatch);
    assert_eq!(alt.canonical_name, "The Rugby Championship");

    let miss = matcher.match_name("Shute Shield", &index);
    assert_eq!(miss.reason, MatchReason::NoMatch);
    assert!(miss.internal_id.is_none());
}

// =============================================================================
// SEASONS
// =============================================================================

#[test]
fn test_split_year_season() {
    let seasons = SeasonNormalizer::new(tables());
    let key = seasons.normalize("Top 14", "Season 2017/2018").unwrap();
    assert_eq!(key.internal_year, 2016);
    assert_eq!(key.year_range, "2016-2017");
    assert_eq!(key.season_id("FRA-TOP-14"), "FRA-TOP-14-SEASON-2016");
    assert_eq!(key.start_date, NaiveDate::from_ymd_opt(2016, 8, 1).unwrap());
    assert_eq!(key.end_date, NaiveDate::from_ymd_opt(2017, 5, 31).unwrap());
}

#[test]
fn test_calendar_year_season() {
    let seasons = SeasonNormalizer::new(tables());
    let key = seasons.normalize("Super Rugby Pacific", "Season 2020").unwrap();
    assert_eq!(key.internal_year, 2020);
    assert_eq!(key.year_range, "2020");
    assert_eq!(key.start_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    assert_eq!(key.end_date, NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
}

#[test]
fn test_season_id_is_stable_across_imports() {
    let seasons = SeasonNormalizer::new(tables());
    let a = seasons.normalize("Top 14", "Season 2017/2018").unwrap();
    let b = seasons.normalize("Top 14", "Season 2017 / 2018").unwrap();
    assert_eq!(a.season_id("FRA-TOP-14"), b.season_id("FRA-TOP-14"));
}

// =============================================================================
// MERGE
// =============================================================================

#[test]
fn test_merge_is_idempotent() {
    let existing = make_team("NZL", "New Zealand", "Crusaders");
    let mut incoming = existing.clone();
    incoming.alt_names.insert("BNZ Crusaders".to_string());
    incoming.logo = "https://img/crusaders.png".to_string();

    let first = merge(Some(existing), incoming.clone(), "providerA").unwrap();
    assert!(!first.changes.is_empty());

    let second = merge(Some(first.entity), incoming, "providerA").unwrap();
    assert!(second.changes.is_empty());
    assert!(!second.needs_write());
}

#[test]
fn test_merge_new_entity() {
    let incoming = make_team("NZL", "New Zealand", "Hurricanes");
    let outcome = merge(None, incoming.clone(), "providerA").unwrap();
    assert!(outcome.is_new);
    assert!(outcome.changes.is_empty());
    assert_eq!(outcome.entity, incoming);
}

#[test]
fn test_source_guarded_logo() {
    let existing = make_logo_team("https://a/crusaders.png", "providerA");
    let incoming = make_logo_team("https://b/crusaders.png", "");

    let from_b = merge(Some(existing.clone()), incoming.clone(), "providerB").unwrap();
    assert!(!from_b.changes.contains_key("logo"));
    assert_eq!(from_b.entity.logo, "https://a/crusaders.png");

    let from_a = merge(Some(existing), incoming, "providerA").unwrap();
    assert!(from_a.changes.contains_key("logo"));
    assert_eq!(from_a.entity.logo, "https://b/crusaders.png");
    assert_eq!(from_a.entity.logo_source, "providerA");
}

#[test]
fn test_empty_logo_is_claimed_by_any_provider() {
    let existing = make_logo_team("", "");
    let incoming = make_logo_team("https://b/crusaders.png", "");
    let outcome = merge(Some(existing), incoming, "providerB").unwrap();
    assert_eq!(outcome.entity.logo_source, "providerB");
}
