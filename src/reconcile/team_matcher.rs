//! Team identity resolution.
//!
//! Order of checks, first success wins:
//! 1. nickname table (bypasses everything else)
//! 2. strict-match guard (fail closed)
//! 3. country narrowing
//! 4. per candidate: directional opposites, suffix compatibility, then
//!    case-insensitive equality of the suffix-canonicalized names
//!
//! A miss is an explicit [`TeamMatch::NoMatch`], never an error.

use std::sync::Arc;
use tracing::debug;

use super::normalize::country_key;
use super::suffix::SuffixClassifier;
use crate::tables::StaticTables;
use crate::types::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVia {
    Nickname,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamMatch {
    Matched {
        team_id: String,
        via: MatchVia,
        /// Incoming spelling to record on the candidate, if new
        alt_name: Option<String>,
    },
    /// Strict-match name with no nickname mapping
    StrictNoMatch,
    NoMatch,
}

#[derive(Debug, Clone)]
pub struct TeamMatcher {
    tables: Arc<StaticTables>,
    suffixes: SuffixClassifier,
}

impl TeamMatcher {
    pub fn new(tables: Arc<StaticTables>) -> Self {
        let suffixes = SuffixClassifier::new(&tables);
        Self { tables, suffixes }
    }

    pub fn suffixes(&self) -> &SuffixClassifier {
        &self.suffixes
    }

    pub fn match_team(
        &self,
        incoming_name: &str,
        incoming_country: &str,
        candidates: &[Team],
    ) -> TeamMatch {
        let incoming_name = incoming_name.trim();

        let nickname = candidates
            .iter()
            .find(|t| self.is_nickname_pair(&t.name, incoming_name));
        if let Some(team) = nickname {
            debug!(incoming = incoming_name, team = %team.id, "team matched via nickname");
            return TeamMatch::Matched {
                team_id: team.id.clone(),
                via: MatchVia::Nickname,
                alt_name: new_alt_name(team, incoming_name),
            };
        }

        if self.tables.strict_match_teams.contains(incoming_name) {
            debug!(incoming = incoming_name, "strict-match team without nickname mapping");
            return TeamMatch::StrictNoMatch;
        }

        let country = country_key(incoming_country, &self.tables.country_aliases);
        let incoming_canonical = self.suffixes.canonical_form(incoming_name).to_lowercase();

        for team in candidates
            .iter()
            .filter(|t| country_key(&t.country.name, &self.tables.country_aliases) == country)
        {
            let names = std::iter::once(&team.name).chain(team.alt_names.iter());
            let hit = names.into_iter().any(|candidate| {
                !self.has_opposite_words(incoming_name, candidate)
                    && self.suffixes.compatible(incoming_name, candidate)
                    && self.suffixes.canonical_form(candidate).to_lowercase() == incoming_canonical
            });
            if hit {
                debug!(incoming = incoming_name, team = %team.id, "team matched by name");
                return TeamMatch::Matched {
                    team_id: team.id.clone(),
                    via: MatchVia::Heuristic,
                    alt_name: new_alt_name(team, incoming_name),
                };
            }
        }

        TeamMatch::NoMatch
    }

    /// Either side may be the canonical key of the nickname table.
    fn is_nickname_pair(&self, candidate: &str, incoming: &str) -> bool {
        let nicknames = &self.tables.team_nicknames;
        nicknames.get(candidate).is_some_and(|alias| alias == incoming)
            || nicknames.get(incoming).is_some_and(|alias| alias == candidate)
    }

    /// True if a word in one name has its directional opposite in the other
    /// ("Northern Knights" / "Southern Knights").
    pub fn has_opposite_words(&self, a: &str, b: &str) -> bool {
        let words_a: Vec<String> = a.split_whitespace().map(str::to_lowercase).collect();
        let words_b: Vec<String> = b.split_whitespace().map(str::to_lowercase).collect();
        words_a.iter().any(|w| {
            self.tables
                .opposite_words
                .get(w)
                .is_some_and(|opposite| words_b.contains(opposite))
        })
    }
}

fn new_alt_name(team: &Team, incoming: &str) -> Option<String> {
    if team.name == incoming || team.alt_names.contains(incoming) {
        None
    } else {
        Some(incoming.to_string())
    }
}

/// Idempotent alternate-name insert; false if nothing changed.
pub fn record_alt_name(team: &mut Team, name: &str) -> bool {
    if team.name == name {
        return false;
    }
    team.alt_names.insert(name.to_string())
}
