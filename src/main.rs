//! Batch entry point: import every configured provider dump into the catalog
//! snapshot, in order, then write the run reports.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, info_span, warn};

use catalog_reconciler::config;
use catalog_reconciler::import::{ImportOptions, Importer};
use catalog_reconciler::logging::{self, LogConfig};
use catalog_reconciler::metrics::{Metrics, Timer};
use catalog_reconciler::provider::{JsonFileProvider, RateLimitedProvider};
use catalog_reconciler::report::save_reports;
use catalog_reconciler::retry::RetryPolicy;
use catalog_reconciler::store::MemoryStore;
use catalog_reconciler::tables::StaticTables;
use catalog_reconciler::types::EntityType;

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before any OnceLock-cached config is read
    dotenvy::dotenv().ok();

    let log_config = LogConfig::from_env();
    let _log_guard = logging::init_logging(&log_config);

    let dry_run = config::dry_run();
    let root_span = info_span!(
        "reconcile",
        run_id = %log_config.run_id,
        dry_run = dry_run,
    );
    let _enter = root_span.enter();

    info!("🏉 Catalog reconciler");
    if dry_run {
        info!("   Mode: DRY RUN (catalog snapshot will not be saved)");
    }

    let tables = Arc::new(match config::tables_path() {
        Some(path) => StaticTables::load_from(path),
        None => StaticTables::builtin(),
    });

    let catalog_path = config::catalog_path();
    let store = Arc::new(
        MemoryStore::load_from(&catalog_path)
            .await
            .with_context(|| format!("failed to load catalog snapshot {}", catalog_path))?,
    );
    info!(
        "📂 Catalog: {} countries, {} leagues, {} seasons, {} teams, {} matches",
        store.count(EntityType::Country).await,
        store.count(EntityType::League).await,
        store.count(EntityType::Season).await,
        store.count(EntityType::Team).await,
        store.count(EntityType::Match).await,
    );

    let dumps = config::provider_dumps_from_env();
    if dumps.is_empty() {
        warn!("PROVIDER_DUMPS is empty; nothing to import");
    }

    let metrics = Arc::new(Metrics::new());
    let mut providers = Vec::with_capacity(dumps.len());
    for dump in &dumps {
        let provider = JsonFileProvider::load(dump)
            .await
            .with_context(|| format!("failed to load provider dump {}", dump))?;
        providers.push(RateLimitedProvider::new(
            provider,
            config::provider_requests_per_second(),
            RetryPolicy::from_env(),
            metrics.clone(),
        ));
    }

    let importer = Importer::new(store.clone(), tables, metrics.clone(), ImportOptions::from_env());
    let timer = Timer::start();
    let batch = importer.run_all(&providers).await;

    metrics.log_summary();
    if let Some(path) = config::metrics_path() {
        metrics
            .save_prometheus(&path)
            .await
            .with_context(|| format!("failed to write metrics {}", path))?;
    }

    let report_path = config::report_path();
    save_reports(&batch.reports, &report_path)
        .await
        .with_context(|| format!("failed to write run report {}", report_path))?;

    if dry_run {
        info!("Dry run: catalog snapshot left untouched");
    } else if !batch.is_complete() {
        warn!("Import aborted: catalog snapshot left untouched");
    } else {
        store
            .save_to(&catalog_path)
            .await
            .with_context(|| format!("failed to save catalog snapshot {}", catalog_path))?;
        info!("💾 Saved catalog snapshot to {}", catalog_path);
    }

    info!("Done in {}ms", timer.elapsed_ms());

    match batch.aborted {
        Some(e) => Err(anyhow::Error::new(e).context("import run aborted")),
        None => Ok(()),
    }
}
