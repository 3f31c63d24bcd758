//! Service modules for the deck statistics pipeline
//!
//! Leaves first:
//! - Durable record store and remote catalog client
//! - Fetch cache (store-first, retried remote fallback)
//! - Card resolver (single-flight memo)
//! - Duplicate map, deck normalizer and dedup index
//! - Affinity aggregation, reports and aggregate export

pub mod affinity;
pub mod card_resolver;
pub mod catalog_client;
pub mod deck_normalizer;
pub mod dedup_index;
pub mod duplicate_map;
pub mod exporter;
pub mod fetch_cache;
pub mod record_store;
pub mod report;

pub use affinity::{deck_level, AffinityAggregator, AffinitySnapshot, AffinityTable, CountMap};
pub use card_resolver::CardResolver;
pub use catalog_client::{CatalogApi, CatalogError, HttpCatalogClient};
pub use deck_normalizer::{canonicalize, content_hash, ContentHash, DeckNormalizer, NormalizedDeck};
pub use dedup_index::{DedupIndex, DedupOutcome};
pub use duplicate_map::DuplicateMap;
pub use exporter::AggregateExporter;
pub use fetch_cache::FetchCache;
pub use record_store::RecordStore;
pub use report::{DiscardReportSink, FileReportSink, InvestigatorReport, ReportLine, ReportSink};
