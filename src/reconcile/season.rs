//! Season label normalization.
//!
//! Providers label seasons as "Season 2017/2018" or "Season 2020". Split-year
//! leagues (European club competitions running August to May) are keyed
//! internally by the year *before* the provisional start year; calendar-year
//! leagues keep it.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::error::ReconcileError;
use crate::tables::StaticTables;
use crate::types::{EntityType, Season};

fn season_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:Season\s+)?(\d{4})(?:\s*/\s*(\d{4}))?$").expect("valid season label regex")
    })
}

/// Internal (league, year) key plus display range and calendar bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonKey {
    pub internal_year: i32,
    pub year_range: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SeasonKey {
    pub fn season_id(&self, league_id: &str) -> String {
        season_id(league_id, self.internal_year)
    }

    pub fn into_season(self, league_id: &str) -> Season {
        Season {
            id: self.season_id(league_id),
            league_id: league_id.to_string(),
            year: self.internal_year,
            year_range: self.year_range,
            start_date: self.start_date,
            end_date: self.end_date,
            current: false,
        }
    }
}

pub fn season_id(league_id: &str, internal_year: i32) -> String {
    format!("{}-SEASON-{}", league_id, internal_year)
}

#[derive(Debug, Clone)]
pub struct SeasonNormalizer {
    tables: Arc<StaticTables>,
}

impl SeasonNormalizer {
    pub fn new(tables: Arc<StaticTables>) -> Self {
        Self { tables }
    }

    /// Provisional start year from "Season <Y1>/<Y2>" or "Season <Y>"
    pub fn parse_label(label: &str) -> Option<i32> {
        let caps = season_label_regex().captures(label.trim())?;
        caps.get(1)?.as_str().parse().ok()
    }

    pub fn normalize(&self, league_name: &str, label: &str) -> Result<SeasonKey, ReconcileError> {
        let unparsable = || {
            ReconcileError::validation(
                EntityType::Season,
                label,
                &format!("unrecognized season label for {}", league_name),
            )
        };
        let start_year = Self::parse_label(label).ok_or_else(unparsable)?;

        let key = if self.tables.is_split_year(league_name) {
            let year = start_year - 1;
            SeasonKey {
                internal_year: year,
                year_range: format!("{}-{}", year, year + 1),
                start_date: NaiveDate::from_ymd_opt(year, 8, 1).ok_or_else(unparsable)?,
                end_date: NaiveDate::from_ymd_opt(year + 1, 5, 31).ok_or_else(unparsable)?,
            }
        } else {
            SeasonKey {
                internal_year: start_year,
                year_range: start_year.to_string(),
                start_date: NaiveDate::from_ymd_opt(start_year, 1, 1).ok_or_else(unparsable)?,
                end_date: NaiveDate::from_ymd_opt(start_year, 12, 31).ok_or_else(unparsable)?,
            }
        };
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> SeasonNormalizer {
        SeasonNormalizer::new(Arc::new(StaticTables::builtin()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(SeasonNormalizer::parse_label("Season 2017/2018"), Some(2017));
        assert_eq!(SeasonNormalizer::parse_label("Season 2020"), Some(2020));
        assert_eq!(SeasonNormalizer::parse_label(" Season 2019 / 2020 "), Some(2019));
        assert_eq!(SeasonNormalizer::parse_label("2021"), Some(2021));
        assert_eq!(SeasonNormalizer::parse_label("Season twenty"), None);
        assert_eq!(SeasonNormalizer::parse_label("Season 2020/21/22"), None);
    }

    #[test]
    fn test_split_year_league() {
        let key = normalizer().normalize("Top 14", "Season 2017/2018").unwrap();
        assert_eq!(key.internal_year, 2016);
        assert_eq!(key.year_range, "2016-2017");
        assert_eq!(key.start_date, date(2016, 8, 1));
        assert_eq!(key.end_date, date(2017, 5, 31));
        assert_eq!(key.season_id("FRA-TOP-14"), "FRA-TOP-14-SEASON-2016");
    }

    #[test]
    fn test_calendar_year_league() {
        let key = normalizer()
            .normalize("Six Nations Championship", "Season 2020")
            .unwrap();
        assert_eq!(key.internal_year, 2020);
        assert_eq!(key.year_range, "2020");
        assert_eq!(key.start_date, date(2020, 1, 1));
        assert_eq!(key.end_date, date(2020, 12, 31));
    }

    #[test]
    fn test_unknown_league_is_calendar_year() {
        let key = normalizer().normalize("Heartland Championship", "Season 2023/2024").unwrap();
        assert_eq!(key.internal_year, 2023);
        assert_eq!(key.year_range, "2023");
    }

    #[test]
    fn test_rederivation_is_stable() {
        let n = normalizer();
        let a = n.normalize("Premiership Rugby", "Season 2022/2023").unwrap();
        let b = n.normalize("Premiership Rugby", "Season 2022/2023").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.clone().into_season("ENG-PREMIERSHIP-RUGBY").id,
            b.season_id("ENG-PREMIERSHIP-RUGBY")
        );
    }

    #[test]
    fn test_bad_label_is_validation_gap() {
        let err = normalizer().normalize("Top 14", "Next season").unwrap_err();
        assert_eq!(err.kind(), "validation_gap");
    }
}
