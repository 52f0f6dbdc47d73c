//! Logging for reconciliation runs.
//!
//! Two layers share one filter:
//! - console: pretty for operators, or JSON when `LOG_FORMAT=json`
//! - `reconcile.log` (daily rotation): always JSON lines, the audit trail of
//!   the run. Each line carries the span list, so every record decision can be
//!   traced back to its `run_id`, provider and stage.
//!
//! Environment: `LOG_FORMAT`, `LOG_DIR` (default `./logs`), `RUN_ID` (UUID,
//! generated when absent or malformed), `RUST_LOG`.

use std::io;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

const DEFAULT_FILTER: &str = "info,catalog_reconciler=info";
const DEFAULT_LOG_DIR: &str = "./logs";
const LOG_FILE: &str = "reconcile.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Anything but "json" (any case) is pretty
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub log_dir: String,
    pub run_id: Uuid,
    pub filter: String,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            format: var("LOG_FORMAT").map_or_else(LogFormat::default, |v| LogFormat::parse(&v)),
            log_dir: var("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
            run_id: parse_run_id(var("RUN_ID").as_deref()),
            filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        }
    }
}

/// A supplied RUN_ID lets a rerun be correlated with an earlier attempt;
/// otherwise every run gets a fresh v4 id.
fn parse_run_id(raw: Option<&str>) -> Uuid {
    raw.and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(io::stdout)
            .with_target(false)
            .pretty()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(io::stdout)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    }
}

/// JSON lines with the full span list (run, provider, stage) on each event
fn audit_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(true)
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered audit lines are lost.
pub fn init_logging(config: &LogConfig) -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {}: {}", config.log_dir, e);
    }
    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE);
    let (audit_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!("Invalid RUST_LOG '{}' ({}), using {}", config.filter, e, DEFAULT_FILTER);
        EnvFilter::new(DEFAULT_FILTER)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(config.format))
        .with(audit_layer(audit_writer))
        .init();

    tracing::info!(
        run_id = %config.run_id,
        log_format = ?config.format,
        audit_log = %format!("{}/{}", config.log_dir, LOG_FILE),
        "Logging initialized"
    );
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, info_span};

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Pretty);
    }

    #[test]
    fn test_run_id_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(parse_run_id(Some(&id.to_string())), id);
        assert_ne!(parse_run_id(Some("not-a-uuid")), parse_run_id(Some("not-a-uuid")));
        assert_ne!(parse_run_id(None), id);
    }

    #[test]
    fn test_audit_lines_carry_run_provider_and_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        let file = std::fs::File::create(&path).unwrap();
        let (writer, guard) = tracing_appender::non_blocking(file);

        let subscriber = tracing_subscriber::registry().with(audit_layer(writer));
        tracing::subscriber::with_default(subscriber, || {
            let run = info_span!("reconcile", run_id = "run-1");
            let _run = run.enter();
            let import = info_span!("import", provider = "rugbydb");
            let _import = import.enter();
            let stage = info_span!("stage", stage = "teams");
            let _stage = stage.enter();
            info!(provider_id = "t3", "record failed");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        let first = contents.lines().next().unwrap();
        let line: serde_json::Value = serde_json::from_str(first).unwrap();
        assert_eq!(line["message"], "record failed");
        assert_eq!(line["provider_id"], "t3");
        let spans = line["spans"].as_array().unwrap();
        assert_eq!(spans[0]["run_id"], "run-1");
        assert_eq!(spans[1]["provider"], "rugbydb");
        assert_eq!(spans[2]["stage"], "teams");
    }
}
