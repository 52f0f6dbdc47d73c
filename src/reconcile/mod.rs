//! Entity Reconciliation & Identity Mapping
//!
//! Decides whether an incoming provider record refers to an entity the
//! catalog already knows, and if so which one. Everything in here is a pure
//! function of its inputs and the read-only [`StaticTables`](crate::tables::StaticTables),
//! except [`LeagueMatcher::resolve`] which also consults and writes the
//! cross-reference table through the storage collaborator.
//!
//! ## Architecture
//!
//! - **normalize**: competition name cleaning and canonical id derivation
//! - **suffix**: gender/age-group qualifier equivalence classes
//! - **team_matcher**: nickname, strict-match, country, opposite-word and suffix rules
//! - **league_matcher**: registry, alt-name and parent/successor resolution
//! - **season**: split-year season keys
//! - **merge**: generic field-level diff and source-guarded overwrite
//!
//! ## Flow
//!
//! ```text
//! provider payload -> NameNormalizer -> {TeamMatcher | LeagueMatcher}
//!                  -> merge -> storage collaborator
//! ```

pub mod league_matcher;
pub mod merge;
mod normalize;
pub mod season;
mod suffix;
pub mod team_matcher;

pub use league_matcher::{LeagueIndex, LeagueMatch, LeagueMatcher, MatchReason};
pub use merge::{merge, ChangeMap, FieldChange, FieldRule, MergeOutcome, Reconcilable};
pub use normalize::{country_key, normalize_country_name, CanonicalIdBuilder, NameNormalizer};
pub use season::{season_id, SeasonKey, SeasonNormalizer};
pub use suffix::SuffixClassifier;
pub use team_matcher::{record_alt_name, MatchVia, TeamMatch, TeamMatcher};
