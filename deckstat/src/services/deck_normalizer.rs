//! Deck normalization and content hashing
//!
//! Turns a fetched decklist into the slot map that is hashed, deduplicated
//! and aggregated:
//! 1. Filter: drop the random basic weakness placeholder and every
//!    non-player (encounter) card
//! 2. Canonicalize: remap variant codes through the duplicates table,
//!    summing quantities that collapse onto the same code
//! 3. Hash the filtered slots and the canonical slots; when they differ the
//!    canonical slots win and a "cards replaced" event is emitted

use crate::models::{DeckRecord, Slots, RANDOM_BASIC_WEAKNESS};
use crate::services::card_resolver::CardResolver;
use crate::services::duplicate_map::DuplicateMap;
use deckstat_common::{EventBus, PipelineEvent, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// SHA-256 over the canonical slot serialization, hex encoded
///
/// Only equality between hashes is meaningful; the digest format is not a
/// compatibility contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of a slot map
///
/// Serialization: one `code\tquantity\n` line per slot in ascending code
/// order. `Slots` is ordered, so the result never depends on the order the
/// catalog listed the cards in.
pub fn content_hash(slots: &Slots) -> ContentHash {
    let mut hasher = Sha256::new();
    for (code, quantity) in slots {
        hasher.update(code.as_bytes());
        hasher.update(b"\t");
        hasher.update(quantity.to_string().as_bytes());
        hasher.update(b"\n");
    }
    ContentHash(format!("{:x}", hasher.finalize()))
}

/// Remap every code to its canonical code, summing collapsed quantities
pub fn canonicalize(slots: &Slots, duplicates: &DuplicateMap) -> Slots {
    let mut canonical = Slots::new();
    for (code, quantity) in slots {
        *canonical
            .entry(duplicates.canonical(code).to_string())
            .or_insert(0) += quantity;
    }
    canonical
}

/// A deck ready for dedup and aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDeck {
    pub id: u64,
    pub investigator_code: String,
    /// Filtered, canonical slots
    pub slots: Slots,
    pub content_hash: ContentHash,
    /// Variant codes were replaced by canonical ones
    pub replaced: bool,
}

/// Filters, canonicalizes and hashes decks
pub struct DeckNormalizer {
    duplicates: Arc<DuplicateMap>,
    resolver: Arc<CardResolver>,
    event_bus: EventBus,
}

impl DeckNormalizer {
    pub fn new(duplicates: Arc<DuplicateMap>, resolver: Arc<CardResolver>, event_bus: EventBus) -> Self {
        Self {
            duplicates,
            resolver,
            event_bus,
        }
    }

    /// Drop the random basic weakness placeholder and encounter cards
    pub async fn filter(&self, slots: &Slots) -> Result<Slots> {
        let mut kept = Slots::new();
        for (code, quantity) in slots {
            if code == RANDOM_BASIC_WEAKNESS {
                continue;
            }
            if self.resolver.get_card(code).await?.is_encounter() {
                tracing::trace!(code = %code, "Dropping encounter card");
                continue;
            }
            kept.insert(code.clone(), *quantity);
        }
        Ok(kept)
    }

    pub fn canonicalize(&self, slots: &Slots) -> Slots {
        canonicalize(slots, &self.duplicates)
    }

    /// Full normalization of one deck
    pub async fn normalize(&self, deck: DeckRecord) -> Result<NormalizedDeck> {
        let filtered = self.filter(&deck.slots).await?;
        let canonical = self.canonicalize(&filtered);

        let raw_hash = content_hash(&filtered);
        let canonical_hash = content_hash(&canonical);
        let replaced = raw_hash != canonical_hash;

        if replaced {
            tracing::info!(
                deck_id = deck.id,
                "Cards in deck were replaced by their canonical card code"
            );
            self.event_bus
                .emit_lossy(PipelineEvent::CardsReplaced { deck_id: deck.id });
        }

        Ok(NormalizedDeck {
            id: deck.id,
            investigator_code: deck.investigator_code,
            slots: canonical,
            content_hash: canonical_hash,
            replaced,
        })
    }
}
