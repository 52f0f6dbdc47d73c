//! Trailing qualifier classification for team names.
//!
//! "Crusaders", "Crusaders Women" and "Crusaders U20" are three different
//! teams; "Crusaders (W)" and "Crusaders Women" are the same one. Suffixes are
//! grouped into equivalence classes, and two names are only comparable when
//! their classes agree.

use std::collections::HashMap;

use crate::tables::StaticTables;

#[derive(Debug, Clone)]
pub struct SuffixClassifier {
    /// Recognized suffixes, longest first so " Women (W)" wins over " (W)"
    suffixes: Vec<String>,
    /// Suffix -> (class id, canonical marker)
    classes: HashMap<String, (String, String)>,
}

impl SuffixClassifier {
    pub fn new(tables: &StaticTables) -> Self {
        let mut suffixes: Vec<String> = tables.team_suffixes.clone();
        for class in tables.suffix_classes.values() {
            for member in &class.members {
                if !suffixes.contains(member) {
                    suffixes.push(member.clone());
                }
            }
        }
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut classes = HashMap::with_capacity(suffixes.len());
        for (class_id, class) in &tables.suffix_classes {
            for member in &class.members {
                classes.insert(member.clone(), (class_id.clone(), class.marker.clone()));
            }
        }
        // Unclassified suffixes form singleton classes
        for suffix in &suffixes {
            classes
                .entry(suffix.clone())
                .or_insert_with(|| (suffix.trim().to_string(), suffix.clone()));
        }

        Self { suffixes, classes }
    }

    /// Longest recognized trailing qualifier, if any
    pub fn suffix_of<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.suffixes
            .iter()
            .find(|s| name.len() > s.len() && name.ends_with(s.as_str()))
            .map(|s| s.as_str())
    }

    /// Equivalence class of the name's trailing qualifier
    pub fn class_of(&self, name: &str) -> Option<&str> {
        let suffix = self.suffix_of(name)?;
        self.classes.get(suffix).map(|(class, _)| class.as_str())
    }

    /// Compatible when both names have no suffix or both suffixes share a
    /// class. A name ending in "(W)" is always compatible with a name
    /// containing "Women".
    pub fn compatible(&self, a: &str, b: &str) -> bool {
        let marked_women = |x: &str, y: &str| x.ends_with("(W)") && y.contains("Women");
        if marked_women(a, b) || marked_women(b, a) {
            return true;
        }
        match (self.class_of(a), self.class_of(b)) {
            (None, None) => true,
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Rewrite the trailing qualifier to its class marker:
    /// "Crusaders (W)" -> "Crusaders W", "Chiefs Under 20" -> "Chiefs U20".
    pub fn canonical_form(&self, name: &str) -> String {
        match self.suffix_of(name) {
            Some(suffix) => {
                let base = &name[..name.len() - suffix.len()];
                let marker = self
                    .classes
                    .get(suffix)
                    .map(|(_, marker)| marker.as_str())
                    .unwrap_or(suffix);
                format!("{}{}", base, marker)
            }
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SuffixClassifier {
        SuffixClassifier::new(&StaticTables::builtin())
    }

    #[test]
    fn test_suffix_of_prefers_longest() {
        let c = classifier();
        assert_eq!(c.suffix_of("Crusaders Women (W)"), Some(" Women (W)"));
        assert_eq!(c.suffix_of("Crusaders (W)"), Some(" (W)"));
        assert_eq!(c.suffix_of("Chiefs Under 20"), Some(" Under 20"));
        assert_eq!(c.suffix_of("Crusaders"), None);
        // A bare suffix is a name, not a qualifier
        assert_eq!(c.suffix_of(" W"), None);
    }

    #[test]
    fn test_class_of() {
        let c = classifier();
        assert_eq!(c.class_of("Crusaders Women"), Some("women"));
        assert_eq!(c.class_of("Crusaders W"), Some("women"));
        assert_eq!(c.class_of("Chiefs Under20"), Some("u20"));
        assert_eq!(c.class_of("England A"), Some("A"));
        assert_eq!(c.class_of("Wasps"), None);
    }

    #[test]
    fn test_compatibility_rules() {
        let c = classifier();
        assert!(c.compatible("Crusaders", "Crusaders"));
        assert!(!c.compatible("Crusaders", "Crusaders Women"));
        assert!(c.compatible("Crusaders W", "Crusaders Women"));
        assert!(c.compatible("Chiefs U20", "Chiefs Under 20"));
        assert!(!c.compatible("Chiefs U20", "Chiefs Women"));
        assert!(!c.compatible("England A", "England XV"));
    }

    #[test]
    fn test_w_paren_overrides_class_lookup() {
        let c = classifier();
        assert!(c.compatible("Crusaders (W)", "Crusaders Women"));
        assert!(c.compatible("Women's Barbarians", "Barbarians (W)"));
    }

    #[test]
    fn test_canonical_form() {
        let c = classifier();
        assert_eq!(c.canonical_form("Crusaders (W)"), "Crusaders W");
        assert_eq!(c.canonical_form("Crusaders Women (W)"), "Crusaders W");
        assert_eq!(c.canonical_form("Chiefs Under 20"), "Chiefs U20");
        assert_eq!(c.canonical_form("England A"), "England A");
        assert_eq!(c.canonical_form("Bath"), "Bath");
    }
}
