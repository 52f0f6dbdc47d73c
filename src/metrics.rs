//! Lock-free counters for a reconciliation run.
//!
//! Shared behind an `Arc` by the importer and the rate-limited provider
//! wrapper; summarized in the log when the run finishes.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::ReconcileError;
use crate::reconcile::{MatchReason, MatchVia};

#[derive(Debug)]
pub struct Metrics {
    // Provider
    pub provider_fetches: Counter,
    /// Every attempt, including retries
    pub provider_requests: Counter,
    pub provider_failures: Counter,

    // Matching
    pub xref_hits: Counter,
    pub league_direct_matches: Counter,
    pub league_alt_name_matches: Counter,
    pub team_nickname_matches: Counter,
    pub team_heuristic_matches: Counter,
    pub no_matches: Counter,
    pub strict_rejections: Counter,

    // Writes
    pub entities_created: Counter,
    pub entities_updated: Counter,
    pub entities_unchanged: Counter,
    pub xref_conflicts: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            provider_fetches: Counter::new("provider_fetches"),
            provider_requests: Counter::new("provider_requests"),
            provider_failures: Counter::new("provider_failures"),
            xref_hits: Counter::new("xref_hits"),
            league_direct_matches: Counter::new("league_direct_matches"),
            league_alt_name_matches: Counter::new("league_alt_name_matches"),
            team_nickname_matches: Counter::new("team_nickname_matches"),
            team_heuristic_matches: Counter::new("team_heuristic_matches"),
            no_matches: Counter::new("no_matches"),
            strict_rejections: Counter::new("strict_rejections"),
            entities_created: Counter::new("entities_created"),
            entities_updated: Counter::new("entities_updated"),
            entities_unchanged: Counter::new("entities_unchanged"),
            xref_conflicts: Counter::new("xref_conflicts"),
        }
    }

    pub fn record_league_match(&self, reason: MatchReason) {
        match reason {
            MatchReason::DirectMatch => self.league_direct_matches.inc(),
            MatchReason::AltNameMatch => self.league_alt_name_matches.inc(),
            MatchReason::CrossReference => self.xref_hits.inc(),
            MatchReason::NoMatch => self.no_matches.inc(),
        }
    }

    pub fn record_team_match(&self, via: MatchVia) {
        match via {
            MatchVia::Nickname => self.team_nickname_matches.inc(),
            MatchVia::Heuristic => self.team_heuristic_matches.inc(),
        }
    }

    /// Requests beyond the first attempt of each fetch
    pub fn provider_retries(&self) -> u64 {
        self.provider_requests
            .get()
            .saturating_sub(self.provider_fetches.get())
    }

    fn all_counters(&self) -> [&Counter; 14] {
        [
            &self.provider_fetches,
            &self.provider_requests,
            &self.provider_failures,
            &self.xref_hits,
            &self.league_direct_matches,
            &self.league_alt_name_matches,
            &self.team_nickname_matches,
            &self.team_heuristic_matches,
            &self.no_matches,
            &self.strict_rejections,
            &self.entities_created,
            &self.entities_updated,
            &self.entities_unchanged,
            &self.xref_conflicts,
        ]
    }

    /// Render counters in Prometheus text exposition format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();
        for counter in self.all_counters() {
            output.push_str(&format!("# TYPE {} counter\n", counter.name()));
            output.push_str(&format!("{} {}\n", counter.name(), counter.get()));
        }
        output
    }

    /// Write [`Self::export_prometheus`] to `path` for a textfile collector
    pub async fn save_prometheus<P: AsRef<Path>>(&self, path: P) -> Result<(), ReconcileError> {
        let path = path.as_ref();
        tokio::fs::write(path, self.export_prometheus())
            .await
            .map_err(|e| ReconcileError::Storage(format!("failed to write {:?}: {}", path, e)))
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Reconciliation Metrics ===");
        tracing::info!(
            "Provider: fetches={} requests={} retries={} failures={}",
            self.provider_fetches.get(),
            self.provider_requests.get(),
            self.provider_retries(),
            self.provider_failures.get()
        );
        tracing::info!(
            "Matching: xref_hits={} league_direct={} league_alt_name={} team_nickname={} team_heuristic={} no_match={} strict_rejected={}",
            self.xref_hits.get(),
            self.league_direct_matches.get(),
            self.league_alt_name_matches.get(),
            self.team_nickname_matches.get(),
            self.team_heuristic_matches.get(),
            self.no_matches.get(),
            self.strict_rejections.get()
        );
        tracing::info!(
            "Writes: created={} updated={} unchanged={} xref_conflicts={}",
            self.entities_created.get(),
            self.entities_updated.get(),
            self.entities_unchanged.get(),
            self.xref_conflicts.get()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Atomic counter for monotonically increasing metrics
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    value: AtomicU64,
}

impl Counter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Wall-clock timer for stage durations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::new("test");
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.add(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_counter_concurrent() {
        use std::sync::Arc;
        use std::thread;

        let counter = Arc::new(Counter::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        counter.inc();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.get(), 2000);
    }

    #[test]
    fn test_match_recording() {
        let metrics = Metrics::new();
        metrics.record_league_match(MatchReason::DirectMatch);
        metrics.record_league_match(MatchReason::CrossReference);
        metrics.record_league_match(MatchReason::NoMatch);
        metrics.record_team_match(MatchVia::Nickname);

        assert_eq!(metrics.league_direct_matches.get(), 1);
        assert_eq!(metrics.xref_hits.get(), 1);
        assert_eq!(metrics.no_matches.get(), 1);
        assert_eq!(metrics.team_nickname_matches.get(), 1);
    }

    #[test]
    fn test_provider_retries() {
        let metrics = Metrics::new();
        metrics.provider_fetches.add(2);
        metrics.provider_requests.add(5);
        assert_eq!(metrics.provider_retries(), 3);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.entities_created.add(4);
        let output = metrics.export_prometheus();
        assert!(output.contains("# TYPE entities_created counter"));
        assert!(output.contains("entities_created 4"));
        assert!(output.contains("xref_conflicts 0"));
    }

    #[tokio::test]
    async fn test_save_prometheus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconcile.prom");
        let metrics = Metrics::new();
        metrics.xref_conflicts.inc();

        metrics.save_prometheus(&path).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, metrics.export_prometheus());
        assert!(written.contains("xref_conflicts 1"));
    }
}
