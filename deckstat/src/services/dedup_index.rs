//! Deck deduplication by content hash
//!
//! Maps each content hash to the ascending, duplicate-free list of deck ids
//! sharing it. Registration is one critical section: the first deck to
//! register a hash is the only one told to aggregate, every later deck with
//! the same hash is recorded as a duplicate.

use crate::services::deck_normalizer::ContentHash;
use deckstat_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Outcome of registering a deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First deck with this content - aggregate it
    Unique,
    /// Content already registered - do not aggregate
    Duplicate {
        /// Ids registered under the hash before this call
        existing: Vec<u64>,
    },
}

/// content hash → sorted deck ids
#[derive(Debug, Default)]
pub struct DedupIndex {
    groups: Mutex<BTreeMap<ContentHash, Vec<u64>>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-then-register under one lock
    ///
    /// **Algorithm:**
    /// 1. Hash absent: register `[deck_id]`, return `Unique`
    /// 2. Hash present: insert `deck_id` at its sorted position (unless
    ///    already there), return `Duplicate` with the previous ids
    pub fn register(&self, hash: &ContentHash, deck_id: u64) -> Result<DedupOutcome> {
        let mut groups = self
            .groups
            .lock()
            .map_err(|_| Error::Internal("dedup index lock poisoned".to_string()))?;

        match groups.get_mut(hash) {
            None => {
                groups.insert(hash.clone(), vec![deck_id]);
                Ok(DedupOutcome::Unique)
            }
            Some(ids) => {
                let existing = ids.clone();
                if let Err(pos) = ids.binary_search(&deck_id) {
                    ids.insert(pos, deck_id);
                }
                Ok(DedupOutcome::Duplicate { existing })
            }
        }
    }

    /// Copy of the whole index, keyed by hash string
    pub fn snapshot(&self) -> Result<BTreeMap<String, Vec<u64>>> {
        let groups = self
            .groups
            .lock()
            .map_err(|_| Error::Internal("dedup index lock poisoned".to_string()))?;
        Ok(groups
            .iter()
            .map(|(hash, ids)| (hash.as_str().to_string(), ids.clone()))
            .collect())
    }
}
