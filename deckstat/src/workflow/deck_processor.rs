//! Per-deck collection step (phase 1)
//!
//! fetch → parse → filter/canonicalize/hash → dedup → level → aggregate

use crate::models::{DeckRecord, ResourceKind};
use crate::services::{
    deck_level, AffinityAggregator, CardResolver, DeckNormalizer, DedupIndex, DedupOutcome,
    FetchCache,
};
use crate::workflow::statistics::RunStatistics;
use deckstat_common::{DeckClass, EventBus, PipelineEvent, Result};
use std::sync::Arc;

/// What happened to one deck id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckOutcome {
    Missing,
    Invalid,
    Duplicate { existing: Vec<u64> },
    Aggregated { class: DeckClass, level: i64 },
}

/// Shared components used by every phase-1 worker
pub struct DeckProcessor {
    cache: Arc<FetchCache>,
    resolver: Arc<CardResolver>,
    normalizer: Arc<DeckNormalizer>,
    dedup: Arc<DedupIndex>,
    aggregator: Arc<AffinityAggregator>,
    stats: Arc<RunStatistics>,
    event_bus: EventBus,
}

impl DeckProcessor {
    pub fn new(
        cache: Arc<FetchCache>,
        resolver: Arc<CardResolver>,
        normalizer: Arc<DeckNormalizer>,
        dedup: Arc<DedupIndex>,
        aggregator: Arc<AffinityAggregator>,
        stats: Arc<RunStatistics>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            cache,
            resolver,
            normalizer,
            dedup,
            aggregator,
            stats,
            event_bus,
        }
    }

    /// Process one deck id
    ///
    /// Only a storage failure is an error; everything else is an outcome.
    /// Registration in the dedup index decides, atomically, which deck of a
    /// content group is aggregated.
    pub async fn process(&self, deck_id: u64) -> Result<DeckOutcome> {
        let Some(document) = self
            .cache
            .fetch(ResourceKind::Decklist, &deck_id.to_string())
            .await?
        else {
            tracing::debug!(deck_id, "Deck not found");
            self.stats.record_missing();
            self.event_bus.emit_lossy(PipelineEvent::DeckMissing { deck_id });
            return Ok(DeckOutcome::Missing);
        };

        let Some(deck) = DeckRecord::from_json(deck_id, &document) else {
            tracing::warn!(deck_id, "Decklist has no investigator, skipping");
            self.stats.record_invalid();
            return Ok(DeckOutcome::Invalid);
        };

        let normalized = self.normalizer.normalize(deck).await?;
        if normalized.replaced {
            self.stats.record_replaced();
        }

        match self.dedup.register(&normalized.content_hash, normalized.id)? {
            DedupOutcome::Duplicate { existing } => {
                tracing::info!(
                    deck_id = normalized.id,
                    hash = %normalized.content_hash,
                    "Deck already exists as {:?}",
                    existing
                );
                self.stats.record_duplicate();
                self.event_bus.emit_lossy(PipelineEvent::DuplicateDeck {
                    deck_id: normalized.id,
                    content_hash: normalized.content_hash.to_string(),
                    existing: existing.clone(),
                });
                Ok(DeckOutcome::Duplicate { existing })
            }
            DedupOutcome::Unique => {
                let level = deck_level(&normalized.slots, &self.resolver).await?;
                let class = DeckClass::from_level(level);

                self.aggregator
                    .record(class, &normalized.investigator_code, &normalized.slots)?;
                self.stats.record_unique(class == DeckClass::Experience);

                tracing::debug!(
                    deck_id = normalized.id,
                    investigator = %normalized.investigator_code,
                    level,
                    "Deck aggregated into {} table",
                    class.label()
                );
                self.event_bus.emit_lossy(PipelineEvent::DeckAggregated {
                    deck_id: normalized.id,
                    investigator_code: normalized.investigator_code,
                    class,
                    level,
                });
                Ok(DeckOutcome::Aggregated { class, level })
            }
        }
    }
}
