//! Temporary store and pipeline builders

use super::FakeCatalog;
use deckstat::services::{
    CardResolver, DiscardReportSink, DuplicateMap, FetchCache, FileReportSink, RecordStore,
};
use deckstat::utils::RetryPolicy;
use deckstat::PipelineOrchestrator;
use deckstat_common::config::{IdSource, PipelineConfig};
use deckstat_common::EventBus;
use std::sync::Arc;
use tempfile::TempDir;

/// Store under a fresh temp dir
///
/// Returns (TempDir, RecordStore) - TempDir must be kept alive for duration of test
pub async fn create_test_store() -> (TempDir, Arc<RecordStore>) {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path().join("db")).await.unwrap();
    (dir, Arc::new(store))
}

/// Fetch cache over a fake catalog, retrying without delay
pub fn create_fetch_cache(store: Arc<RecordStore>, catalog: Arc<FakeCatalog>, attempts: u32) -> Arc<FetchCache> {
    Arc::new(FetchCache::new(
        store,
        catalog,
        RetryPolicy::new(attempts, deckstat::utils::Backoff::Fixed(std::time::Duration::ZERO)),
    ))
}

pub fn create_resolver(store: Arc<RecordStore>, catalog: Arc<FakeCatalog>) -> Arc<CardResolver> {
    Arc::new(CardResolver::new(create_fetch_cache(store, catalog, 1)))
}

/// Config for a range run with no retry delay
pub fn test_config(dir: &TempDir, first: u64, last: u64, workers: usize) -> PipelineConfig {
    let mut config = PipelineConfig::with_defaults(dir.path().join("db"), dir.path().join("out"));
    config.id_source = IdSource::Range { first, last };
    config.worker_count = workers;
    config.retry.max_attempts = 2;
    config.retry.delay_ms = 0;
    config
}

/// Orchestrator over a fake catalog
pub async fn create_test_orchestrator(
    config: PipelineConfig,
    catalog: Arc<FakeCatalog>,
    duplicates: DuplicateMap,
    event_bus: EventBus,
) -> PipelineOrchestrator {
    let store = Arc::new(RecordStore::open(&config.store_root).await.unwrap());
    let sink: Arc<dyn deckstat::services::ReportSink> = if config.write_reports {
        Arc::new(FileReportSink::create(&config.output_dir).await.unwrap())
    } else {
        Arc::new(DiscardReportSink)
    };
    PipelineOrchestrator::with_components(config, store, catalog, duplicates, sink, event_bus)
}
