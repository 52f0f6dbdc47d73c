//! Provider-fetch collaborator.
//!
//! Providers hand back already-decoded records keyed by their own ids. The
//! importer only sees [`ProviderFetch`]; [`JsonFileProvider`] serves a dump
//! file and [`RateLimitedProvider`] puts any provider behind a fixed request
//! cadence plus bounded retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState, state::NotKeyed, Quota,
    RateLimiter,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::metrics::Metrics;
use crate::retry::{retry_async, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCountry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLeague {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSeason {
    pub id: String,
    /// Provider's own league id
    pub league_id: String,
    /// "Season 2017/2018" or "Season 2020"
    pub label: String,
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMatch {
    pub id: String,
    /// Provider's own season id
    pub season_id: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub kick_off: DateTime<Utc>,
    /// Free-text provider status ("Finished", "In Play", ...)
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

#[async_trait]
pub trait ProviderFetch: Send + Sync {
    /// Provider name used as cross-reference namespace and source tag
    fn name(&self) -> &str;

    async fn countries(&self) -> Result<Vec<ProviderCountry>, ReconcileError>;
    async fn leagues(&self) -> Result<Vec<ProviderLeague>, ReconcileError>;
    async fn seasons(&self) -> Result<Vec<ProviderSeason>, ReconcileError>;
    async fn teams(&self) -> Result<Vec<ProviderTeam>, ReconcileError>;
    async fn matches(&self) -> Result<Vec<ProviderMatch>, ReconcileError>;
}

/// On-disk provider dump; every section is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDump {
    pub provider: String,
    pub countries: Vec<ProviderCountry>,
    pub leagues: Vec<ProviderLeague>,
    pub seasons: Vec<ProviderSeason>,
    pub teams: Vec<ProviderTeam>,
    pub matches: Vec<ProviderMatch>,
}

/// Serves records from a decoded [`ProviderDump`]
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    dump: ProviderDump,
}

impl JsonFileProvider {
    pub fn new(dump: ProviderDump) -> Self {
        Self { dump }
    }

    /// Read a dump file. The provider name defaults to the file stem when
    /// the dump does not carry one.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReconcileError> {
        let path = path.as_ref();
        let unavailable = |message: String| ReconcileError::ProviderUnavailable {
            provider: path.display().to_string(),
            status: None,
            message,
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| unavailable(format!("failed to read dump: {}", e)))?;
        let mut dump: ProviderDump = serde_json::from_str(&contents)
            .map_err(|e| unavailable(format!("failed to parse dump: {}", e)))?;

        if dump.provider.trim().is_empty() {
            dump.provider = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string());
        }

        info!(
            provider = %dump.provider,
            countries = dump.countries.len(),
            leagues = dump.leagues.len(),
            seasons = dump.seasons.len(),
            teams = dump.teams.len(),
            matches = dump.matches.len(),
            "Loaded provider dump from {:?}",
            path
        );
        Ok(Self { dump })
    }
}

#[async_trait]
impl ProviderFetch for JsonFileProvider {
    fn name(&self) -> &str {
        &self.dump.provider
    }

    async fn countries(&self) -> Result<Vec<ProviderCountry>, ReconcileError> {
        Ok(self.dump.countries.clone())
    }

    async fn leagues(&self) -> Result<Vec<ProviderLeague>, ReconcileError> {
        Ok(self.dump.leagues.clone())
    }

    async fn seasons(&self) -> Result<Vec<ProviderSeason>, ReconcileError> {
        Ok(self.dump.seasons.clone())
    }

    async fn teams(&self) -> Result<Vec<ProviderTeam>, ReconcileError> {
        Ok(self.dump.teams.clone())
    }

    async fn matches(&self) -> Result<Vec<ProviderMatch>, ReconcileError> {
        Ok(self.dump.matches.clone())
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Wraps a provider with a direct (unkeyed) rate limiter and bounded retry.
///
/// Every attempt, retries included, waits for a limiter cell first.
pub struct RateLimitedProvider<P> {
    inner: P,
    limiter: Arc<DirectRateLimiter>,
    policy: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl<P: ProviderFetch> RateLimitedProvider<P> {
    pub fn new(
        inner: P,
        requests_per_second: u32,
        policy: RetryPolicy,
        metrics: Arc<Metrics>,
    ) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        debug!(provider = inner.name(), rps = rps.get(), "provider rate limiter configured");
        Self {
            inner,
            limiter,
            policy,
            metrics,
        }
    }

    async fn call<T, F, Fut>(&self, op: &str, fetch: F) -> Result<Vec<T>, ReconcileError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>, ReconcileError>>,
    {
        self.metrics.provider_fetches.inc();
        let op_name = format!("{}.{}", self.inner.name(), op);
        let result = retry_async(&self.policy, &op_name, || {
            let limiter = self.limiter.clone();
            let metrics = self.metrics.clone();
            let fut = fetch();
            async move {
                limiter.until_ready().await;
                metrics.provider_requests.inc();
                fut.await
            }
        })
        .await;

        match &result {
            Ok(records) => {
                debug!(op = %op_name, records = records.len(), "provider fetch complete")
            }
            Err(e) => {
                self.metrics.provider_failures.inc();
                warn!(op = %op_name, "provider fetch failed: {}", e);
            }
        }
        result
    }
}

#[async_trait]
impl<P: ProviderFetch> ProviderFetch for RateLimitedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn countries(&self) -> Result<Vec<ProviderCountry>, ReconcileError> {
        self.call("countries", || self.inner.countries()).await
    }

    async fn leagues(&self) -> Result<Vec<ProviderLeague>, ReconcileError> {
        self.call("leagues", || self.inner.leagues()).await
    }

    async fn seasons(&self) -> Result<Vec<ProviderSeason>, ReconcileError> {
        self.call("seasons", || self.inner.seasons()).await
    }

    async fn teams(&self) -> Result<Vec<ProviderTeam>, ReconcileError> {
        self.call("teams", || self.inner.teams()).await
    }

    async fn matches(&self) -> Result<Vec<ProviderMatch>, ReconcileError> {
        self.call("matches", || self.inner.matches()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with a 503 before serving one team
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ProviderFetch for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn countries(&self) -> Result<Vec<ProviderCountry>, ReconcileError> {
            Ok(vec![])
        }

        async fn leagues(&self) -> Result<Vec<ProviderLeague>, ReconcileError> {
            Ok(vec![])
        }

        async fn seasons(&self) -> Result<Vec<ProviderSeason>, ReconcileError> {
            Ok(vec![])
        }

        async fn teams(&self) -> Result<Vec<ProviderTeam>, ReconcileError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ReconcileError::ProviderUnavailable {
                    provider: "flaky".to_string(),
                    status: Some(503),
                    message: "try later".to_string(),
                });
            }
            Ok(vec![ProviderTeam {
                id: "1".to_string(),
                name: "Leinster".to_string(),
                country_code: Some("IRL".to_string()),
                country_name: Some("Ireland".to_string()),
                logo: None,
            }])
        }

        async fn matches(&self) -> Result<Vec<ProviderMatch>, ReconcileError> {
            Ok(vec![])
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_rate_limited_provider_retries_transient_errors() {
        let metrics = Arc::new(Metrics::new());
        let provider = RateLimitedProvider::new(
            FlakyProvider {
                failures: 2,
                calls: AtomicU32::new(0),
            },
            1000,
            fast_policy(),
            metrics.clone(),
        );

        let teams = provider.teams().await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(metrics.provider_fetches.get(), 1);
        assert_eq!(metrics.provider_requests.get(), 3);
        assert_eq!(metrics.provider_retries(), 2);
        assert_eq!(metrics.provider_failures.get(), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_provider_gives_up() {
        let metrics = Arc::new(Metrics::new());
        let provider = RateLimitedProvider::new(
            FlakyProvider {
                failures: 10,
                calls: AtomicU32::new(0),
            },
            1000,
            fast_policy(),
            metrics.clone(),
        );

        let err = provider.teams().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(metrics.provider_requests.get(), 3);
        assert_eq!(metrics.provider_failures.get(), 1);
    }

    #[tokio::test]
    async fn test_json_file_provider_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rugbydb.json");
        std::fs::write(
            &path,
            r#"{
                "teams": [{"id": "7", "name": "Munster", "country_code": "IRL"}],
                "matches": [{
                    "id": "m1", "season_id": "s1", "home_team_id": "7", "away_team_id": "8",
                    "kick_off": "2024-03-08T19:45:00Z", "status": "Finished",
                    "home_score": 21, "away_score": 18
                }]
            }"#,
        )
        .unwrap();

        let provider = JsonFileProvider::load(&path).await.unwrap();
        assert_eq!(provider.name(), "rugbydb");
        assert_eq!(provider.teams().await.unwrap()[0].name, "Munster");
        assert_eq!(provider.matches().await.unwrap()[0].home_score, Some(21));
        assert!(provider.leagues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_file_provider_missing_file() {
        let err = JsonFileProvider::load("/nonexistent/dump.json").await.unwrap_err();
        assert_eq!(err.kind(), "provider_unavailable");
    }
}
