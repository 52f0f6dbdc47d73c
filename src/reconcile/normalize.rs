//! Name normalization and canonical id derivation.
//!
//! Provider names arrive with embedded season years ("Top 14 (2024-25)"),
//! sponsor prefixes and abbreviations. `NameNormalizer` reduces them to the
//! canonical display name; `CanonicalIdBuilder` turns a country code plus that
//! name into the stable internal id.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::tables::StaticTables;

/// "(2024)", "(2024-25)", "(2023-2024)" with any leading whitespace
fn year_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(\d{4}(?:-\d{2,4})?\)").expect("valid year token regex"))
}

/// Cleans free-text competition names. Idempotent.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    tables: Arc<StaticTables>,
}

impl NameNormalizer {
    pub fn new(tables: Arc<StaticTables>) -> Self {
        Self { tables }
    }

    /// Strip year tokens, trim, then apply the standardization table until it
    /// stops changing the name.
    ///
    /// The table is chained ("Heineken Cup" -> "European Rugby Champions Cup"
    /// -> "European Champions Cup"), so a single lookup would not be idempotent.
    /// Casing is otherwise preserved.
    pub fn normalize(&self, raw: &str) -> String {
        let stripped = year_token_regex().replace_all(raw, "");
        let mut name = stripped.trim().to_string();
        standardize_to_fixpoint(&mut name, &self.tables.name_standardization);
        name
    }
}

fn standardize_to_fixpoint(name: &mut String, table: &BTreeMap<String, String>) {
    // Each hop must reach a name not seen before, so a cyclic table terminates
    let mut seen = vec![name.clone()];
    while let Some(next) = table.get(name.as_str()) {
        let next = next.trim();
        if seen.iter().any(|s| s == next) {
            break;
        }
        *name = next.to_string();
        seen.push(name.clone());
    }
}

/// Deterministic internal id derivation.
pub struct CanonicalIdBuilder;

impl CanonicalIdBuilder {
    /// `<country>-<NAME>`: name uppercased, spaces to hyphens, apostrophes and
    /// periods removed. Pure: the same inputs always give the same id.
    pub fn build(country_code: &str, name: &str) -> String {
        let mut id = String::with_capacity(country_code.len() + 1 + name.len());
        id.push_str(country_code);
        id.push('-');
        for c in name.chars() {
            match c {
                ' ' => id.push('-'),
                '\'' | '.' => {}
                _ => id.extend(c.to_uppercase()),
            }
        }
        id
    }
}

/// Comparison key for country names: hyphens to spaces, collapsed whitespace,
/// lowercase, then resolved through the alias table.
pub fn country_key(name: &str, aliases: &BTreeMap<String, String>) -> String {
    let cleaned = name
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match aliases.get(&cleaned) {
        Some(canonical) => canonical.to_lowercase(),
        None => cleaned,
    }
}

/// Display name for a provider country name ("Russian Federation" -> "Russia").
pub fn normalize_country_name(name: &str, aliases: &BTreeMap<String, String>) -> String {
    let trimmed = name.trim();
    let cleaned = trimmed
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    aliases
        .get(&cleaned)
        .cloned()
        .unwrap_or_else(|| trimmed.to_string())
}
