//! Pipeline orchestration
//!
//! Three phases separated by full barriers:
//! - **Collecting**: a worker pool drains the deck ids, aggregating every
//!   newly deduplicated deck into the base or experience table
//! - **BaseReports**: a worker pool renders one report per investigator of
//!   the frozen base table
//! - **ExperienceReports**: same over the experience table
//!
//! The aggregate documents are exported once the last phase has joined.

pub mod deck_processor;
pub mod statistics;
pub mod work_queue;

pub use deck_processor::{DeckOutcome, DeckProcessor};
pub use statistics::{RunStatistics, RunStatisticsSnapshot};
pub use work_queue::{run_worker_pool, WorkQueue};

use crate::models::ResourceKind;
use crate::services::{
    AffinityAggregator, AffinitySnapshot, AffinityTable, AggregateExporter, CardResolver,
    CatalogApi, DeckNormalizer, DedupIndex, DiscardReportSink, DuplicateMap, FetchCache,
    FileReportSink, HttpCatalogClient, InvestigatorReport, RecordStore, ReportSink,
};
use crate::utils::RetryPolicy;
use chrono::Utc;
use deckstat_common::config::{IdSource, PipelineConfig};
use deckstat_common::{DeckClass, Error, EventBus, PipelineEvent, PipelinePhase, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub statistics: RunStatisticsSnapshot,
    pub worker_count: usize,
    pub affinity: AffinitySnapshot,
    /// content hash → deck ids sharing it
    pub deck_groups: BTreeMap<String, Vec<u64>>,
    pub exported: Vec<PathBuf>,
}

/// Wires the services together and runs the phases
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    cache: Arc<FetchCache>,
    resolver: Arc<CardResolver>,
    normalizer: Arc<DeckNormalizer>,
    report_sink: Arc<dyn ReportSink>,
    exporter: AggregateExporter,
    event_bus: EventBus,
}

impl PipelineOrchestrator {
    /// Build the production pipeline: on-disk store, HTTP catalog,
    /// duplicates table from the store, file reports when enabled
    pub async fn from_config(config: PipelineConfig, event_bus: EventBus) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(RecordStore::open(&config.store_root).await?);
        let client = HttpCatalogClient::new(
            &config.api_base_url,
            config.request_timeout_secs,
            config.request_interval_ms,
        )
        .map_err(|e| Error::Config(format!("HTTP client setup failed: {}", e)))?;
        let duplicates = DuplicateMap::load(&config.duplicates_path())?;

        let report_sink: Arc<dyn ReportSink> = if config.write_reports {
            Arc::new(FileReportSink::create(&config.output_dir).await?)
        } else {
            Arc::new(DiscardReportSink)
        };

        Ok(Self::with_components(
            config,
            store,
            Arc::new(client),
            duplicates,
            report_sink,
            event_bus,
        ))
    }

    /// Build from explicit components
    pub fn with_components(
        config: PipelineConfig,
        store: Arc<RecordStore>,
        client: Arc<dyn CatalogApi>,
        duplicates: DuplicateMap,
        report_sink: Arc<dyn ReportSink>,
        event_bus: EventBus,
    ) -> Self {
        let cache = Arc::new(FetchCache::new(
            store,
            client,
            RetryPolicy::from(config.retry),
        ));
        let resolver = Arc::new(CardResolver::new(Arc::clone(&cache)));
        let normalizer = Arc::new(DeckNormalizer::new(
            Arc::new(duplicates),
            Arc::clone(&resolver),
            event_bus.clone(),
        ));
        let exporter = AggregateExporter::new(config.output_dir.clone());

        Self {
            config,
            cache,
            resolver,
            normalizer,
            report_sink,
            exporter,
            event_bus,
        }
    }

    /// Deck ids to collect, ascending and duplicate-free
    pub async fn deck_ids(&self) -> Result<Vec<u64>> {
        let mut ids: Vec<u64> = match &self.config.id_source {
            IdSource::Range { first, last } => (*first..=*last).collect(),
            IdSource::LocalStore => self
                .cache
                .store()
                .list_ids(ResourceKind::Decklist)
                .await?
                .into_iter()
                .filter_map(|id| match id.parse::<u64>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::debug!(id = %id, "Ignoring non-numeric decklist file");
                        None
                    }
                })
                .collect(),
        };
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Run all phases and export the aggregates
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let workers = self.config.worker_count;
        let stats = Arc::new(RunStatistics::new());

        // Phase 1: collect
        let ids = self.deck_ids().await?;
        stats.set_ids_queued(ids.len());
        tracing::info!(decks = ids.len(), workers, "Collecting decks");

        let dedup = Arc::new(DedupIndex::new());
        let aggregator = Arc::new(AffinityAggregator::new());
        let processor = Arc::new(DeckProcessor::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.resolver),
            Arc::clone(&self.normalizer),
            Arc::clone(&dedup),
            Arc::clone(&aggregator),
            Arc::clone(&stats),
            self.event_bus.clone(),
        ));

        let queue = Arc::new(WorkQueue::from_items(ids));
        self.run_phase(PipelinePhase::Collecting, queue, move |deck_id| {
            let processor = Arc::clone(&processor);
            async move { processor.process(deck_id).await.map(|_| ()) }
        })
        .await?;

        let affinity = Arc::try_unwrap(aggregator)
            .map_err(|_| Error::Internal("affinity tables still shared after collection".to_string()))?
            .into_snapshot()?;
        let deck_groups = dedup.snapshot()?;

        // Phases 2 and 3: reports over the frozen tables
        self.run_report_phase(
            PipelinePhase::BaseReports,
            DeckClass::Base,
            Arc::clone(&affinity.base),
            Arc::clone(&stats),
        )
        .await?;
        self.run_report_phase(
            PipelinePhase::ExperienceReports,
            DeckClass::Experience,
            Arc::clone(&affinity.experience),
            Arc::clone(&stats),
        )
        .await?;

        let exported = self.exporter.export(&affinity, &deck_groups).await?;

        let statistics = stats.snapshot(start.elapsed().as_millis() as u64);
        let cards = self.resolver.resolved_count()?;
        tracing::info!(
            remote_fetches = self.cache.remote_fetches(),
            cards,
            "{}",
            statistics.display_string()
        );

        Ok(RunSummary {
            statistics,
            worker_count: workers,
            affinity,
            deck_groups,
            exported,
        })
    }

    async fn run_report_phase(
        &self,
        phase: PipelinePhase,
        class: DeckClass,
        table: Arc<AffinityTable>,
        stats: Arc<RunStatistics>,
    ) -> Result<usize> {
        let queue = Arc::new(WorkQueue::from_items(table.investigator_codes()));
        let resolver = Arc::clone(&self.resolver);
        let sink = Arc::clone(&self.report_sink);
        let relevance = self.config.relevance_threshold;
        let count_written = self.config.write_reports;

        self.run_phase(phase, queue, move |investigator_code: String| {
            let table = Arc::clone(&table);
            let resolver = Arc::clone(&resolver);
            let sink = Arc::clone(&sink);
            let stats = Arc::clone(&stats);
            async move {
                let report =
                    InvestigatorReport::build(class, &investigator_code, &table, &resolver, relevance)
                        .await?;
                sink.write(&report).await?;
                if count_written {
                    stats.record_report();
                }
                Ok(())
            }
        })
        .await
    }

    /// One worker pool with phase events around it
    async fn run_phase<T, H, Fut>(
        &self,
        phase: PipelinePhase,
        queue: Arc<WorkQueue<T>>,
        handler: H,
    ) -> Result<usize>
    where
        T: Send + 'static,
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let start = Instant::now();
        self.event_bus.emit_lossy(PipelineEvent::PhaseStarted {
            phase,
            items: queue.len(),
            timestamp: Utc::now(),
        });

        let processed = run_worker_pool(phase, self.config.worker_count, queue, handler).await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(phase = phase.label(), processed, elapsed_ms, "Phase complete");
        self.event_bus.emit_lossy(PipelineEvent::PhaseCompleted {
            phase,
            processed,
            elapsed_ms,
            timestamp: Utc::now(),
        });
        Ok(processed)
    }
}
