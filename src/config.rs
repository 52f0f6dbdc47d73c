//! Runtime configuration.
//!
//! Every knob is an environment variable (a `.env` file is loaded first by
//! `main`). Numeric values are parsed once and cached; invalid values log a
//! warning and fall back to the default.

use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::warn;

/// Default provider request cadence (requests per second)
const DEFAULT_PROVIDER_REQUESTS_PER_SECOND: u32 = 10;

/// Default number of records reconciled concurrently within one batch
const DEFAULT_IMPORT_CONCURRENCY: usize = 8;

const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

/// Upper bound on retry attempts regardless of configuration
const MAX_RETRY_ATTEMPTS: u32 = 10;

pub const DEFAULT_CATALOG_PATH: &str = "catalog.json";
pub const DEFAULT_REPORT_PATH: &str = "reconcile_report.json";

/// Parse a positive number from `var`, warning on garbage.
fn positive_from_env<T>(var: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(n) if n > T::default() => n,
            _ => {
                warn!("Failed to parse {}='{}', using default {}", var, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn flag_from_env(var: &str) -> bool {
    std::env::var(var)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

fn list_from_env(var: &str) -> Vec<String> {
    std::env::var(var)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Provider request cadence from PROVIDER_REQUESTS_PER_SECOND
pub fn provider_requests_per_second() -> u32 {
    static CACHED: OnceLock<u32> = OnceLock::new();
    *CACHED.get_or_init(|| {
        positive_from_env("PROVIDER_REQUESTS_PER_SECOND", DEFAULT_PROVIDER_REQUESTS_PER_SECOND)
    })
}

/// Records reconciled in parallel within a batch, from IMPORT_CONCURRENCY
pub fn import_concurrency() -> usize {
    static CACHED: OnceLock<usize> = OnceLock::new();
    *CACHED.get_or_init(|| positive_from_env("IMPORT_CONCURRENCY", DEFAULT_IMPORT_CONCURRENCY))
}

pub fn retry_max_attempts() -> u32 {
    static CACHED: OnceLock<u32> = OnceLock::new();
    *CACHED.get_or_init(|| {
        let n = positive_from_env("RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_MAX_ATTEMPTS);
        if n > MAX_RETRY_ATTEMPTS {
            warn!(
                "RETRY_MAX_ATTEMPTS={} above cap, using {}",
                n, MAX_RETRY_ATTEMPTS
            );
            MAX_RETRY_ATTEMPTS
        } else {
            n
        }
    })
}

pub fn retry_base_delay_ms() -> u64 {
    static CACHED: OnceLock<u64> = OnceLock::new();
    *CACHED.get_or_init(|| positive_from_env("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS))
}

pub fn retry_max_delay_ms() -> u64 {
    static CACHED: OnceLock<u64> = OnceLock::new();
    *CACHED.get_or_init(|| positive_from_env("RETRY_MAX_DELAY_MS", DEFAULT_RETRY_MAX_DELAY_MS))
}

/// Catalog snapshot location (CATALOG_PATH)
pub fn catalog_path() -> String {
    std::env::var("CATALOG_PATH").unwrap_or_else(|_| DEFAULT_CATALOG_PATH.to_string())
}

/// Run report location (REPORT_PATH)
pub fn report_path() -> String {
    std::env::var("REPORT_PATH").unwrap_or_else(|_| DEFAULT_REPORT_PATH.to_string())
}

/// Optional static-table override (TABLES_PATH)
pub fn tables_path() -> Option<String> {
    std::env::var("TABLES_PATH").ok().filter(|s| !s.trim().is_empty())
}

/// Optional Prometheus textfile dump of the run counters (METRICS_PATH)
pub fn metrics_path() -> Option<String> {
    std::env::var("METRICS_PATH").ok().filter(|s| !s.trim().is_empty())
}

/// Provider dump files, in import order.
/// Example: PROVIDER_DUMPS="dumps/api_sports.json,dumps/rugbydb.json"
pub fn provider_dumps_from_env() -> Vec<String> {
    list_from_env("PROVIDER_DUMPS")
}

/// Team names that may be created when no existing team matches.
/// Example: PRIORITY_TEAMS="Black Ferns,Wallaroos"
pub fn priority_teams_from_env() -> BTreeSet<String> {
    list_from_env("PRIORITY_TEAMS").into_iter().collect()
}

/// DRY_RUN=1 computes the run and the report but does not save the catalog
pub fn dry_run() -> bool {
    flag_from_env("DRY_RUN")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_from_env() {
        std::env::set_var("TEST_CFG_POSITIVE", "25");
        assert_eq!(positive_from_env("TEST_CFG_POSITIVE", 10u32), 25);

        std::env::set_var("TEST_CFG_POSITIVE", "0");
        assert_eq!(positive_from_env("TEST_CFG_POSITIVE", 10u32), 10);

        std::env::set_var("TEST_CFG_POSITIVE", "ten");
        assert_eq!(positive_from_env("TEST_CFG_POSITIVE", 10u32), 10);

        std::env::remove_var("TEST_CFG_POSITIVE");
        assert_eq!(positive_from_env("TEST_CFG_POSITIVE", 10u32), 10);
    }

    #[test]
    fn test_list_from_env() {
        std::env::set_var("TEST_CFG_LIST", " Black Ferns, ,Wallaroos ");
        assert_eq!(list_from_env("TEST_CFG_LIST"), vec!["Black Ferns", "Wallaroos"]);

        std::env::set_var("TEST_CFG_LIST", "   ");
        assert!(list_from_env("TEST_CFG_LIST").is_empty());

        std::env::remove_var("TEST_CFG_LIST");
    }

    #[test]
    fn test_flag_from_env() {
        std::env::set_var("TEST_CFG_FLAG", "TRUE");
        assert!(flag_from_env("TEST_CFG_FLAG"));
        std::env::set_var("TEST_CFG_FLAG", "0");
        assert!(!flag_from_env("TEST_CFG_FLAG"));
        std::env::remove_var("TEST_CFG_FLAG");
        assert!(!flag_from_env("TEST_CFG_FLAG"));
    }
}
