//! Affinity aggregation
//!
//! Two co-occurrence tables, one for decks that spent no experience and one
//! for decks that did. Each table counts:
//! - investigator → card: decks of that investigator containing the card
//!   (presence, not quantity)
//! - card → card: decks containing both cards, kept symmetric
//!
//! All inner maps are `BTreeMap`s, so every table is key-sorted at all
//! times and serializes reproducibly.

use crate::models::Slots;
use crate::services::card_resolver::CardResolver;
use deckstat_common::{DeckClass, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// code → count
pub type CountMap = BTreeMap<String, u64>;

/// One co-occurrence table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityTable {
    /// investigator code → card code → decks using it
    pub investigators: BTreeMap<String, CountMap>,
    /// card code → other card code → decks containing both
    pub cards: BTreeMap<String, CountMap>,
    /// Decks aggregated into this table
    pub decks: u64,
}

impl AffinityTable {
    /// Apply one deck
    pub fn record_deck(&mut self, investigator_code: &str, slots: &Slots) {
        self.decks += 1;

        let usage = self
            .investigators
            .entry(investigator_code.to_string())
            .or_default();
        for code in slots.keys() {
            *usage.entry(code.clone()).or_insert(0) += 1;
        }

        let codes: Vec<&String> = slots.keys().collect();
        for (i, c1) in codes.iter().enumerate() {
            for c2 in &codes[i + 1..] {
                *self
                    .cards
                    .entry((*c1).clone())
                    .or_default()
                    .entry((*c2).clone())
                    .or_insert(0) += 1;
                *self
                    .cards
                    .entry((*c2).clone())
                    .or_default()
                    .entry((*c1).clone())
                    .or_insert(0) += 1;
            }
        }
    }

    /// Card usage counts for one investigator
    pub fn investigator(&self, investigator_code: &str) -> Option<&CountMap> {
        self.investigators.get(investigator_code)
    }

    /// Co-occurrence count of two cards
    pub fn pair(&self, c1: &str, c2: &str) -> u64 {
        self.cards
            .get(c1)
            .and_then(|others| others.get(c2))
            .copied()
            .unwrap_or(0)
    }

    /// Investigator codes, ascending
    pub fn investigator_codes(&self) -> Vec<String> {
        self.investigators.keys().cloned().collect()
    }
}

/// Total experience of a deck: `sum(card.xp * quantity)`
///
/// A card without a numeric xp contributes 0. Out-of-range catalog values
/// saturate at `i64::MAX`/`i64::MIN` instead of overflowing.
pub async fn deck_level(slots: &Slots, resolver: &CardResolver) -> Result<i64> {
    let mut total = 0i64;
    for (code, quantity) in slots {
        let card = resolver.get_card(code).await?;
        let xp = card.xp_or_zero();
        let contribution = xp.checked_mul(i64::from(*quantity));
        match contribution.and_then(|c| total.checked_add(c)) {
            Some(sum) => total = sum,
            None => {
                tracing::warn!(code = %code, xp, quantity, "Deck level out of range, saturating");
                total = total.saturating_add(xp.saturating_mul(i64::from(*quantity)));
            }
        }
    }
    Ok(total)
}

/// Shared, lock-guarded tables written during collection
#[derive(Debug, Default)]
pub struct AffinityAggregator {
    base: Mutex<AffinityTable>,
    experience: Mutex<AffinityTable>,
}

impl AffinityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate one newly deduplicated deck into exactly one table
    pub fn record(&self, class: DeckClass, investigator_code: &str, slots: &Slots) -> Result<()> {
        let table = match class {
            DeckClass::Base => &self.base,
            DeckClass::Experience => &self.experience,
        };
        table
            .lock()
            .map_err(|_| Error::Internal(format!("{} table lock poisoned", class.label())))?
            .record_deck(investigator_code, slots);
        Ok(())
    }

    /// Freeze both tables once every writer has finished
    pub fn into_snapshot(self) -> Result<AffinitySnapshot> {
        let base = self
            .base
            .into_inner()
            .map_err(|_| Error::Internal("base table lock poisoned".to_string()))?;
        let experience = self
            .experience
            .into_inner()
            .map_err(|_| Error::Internal("experience table lock poisoned".to_string()))?;

        Ok(AffinitySnapshot {
            base: Arc::new(base),
            experience: Arc::new(experience),
        })
    }
}

/// Immutable, fully populated tables
#[derive(Debug, Clone)]
pub struct AffinitySnapshot {
    pub base: Arc<AffinityTable>,
    pub experience: Arc<AffinityTable>,
}

impl AffinitySnapshot {
    pub fn table(&self, class: DeckClass) -> &Arc<AffinityTable> {
        match class {
            DeckClass::Base => &self.base,
            DeckClass::Experience => &self.experience,
        }
    }

    /// card → card counts summed over both tables
    pub fn combined_card_affinity(&self) -> BTreeMap<String, CountMap> {
        let mut combined = self.base.cards.clone();
        for (card, others) in &self.experience.cards {
            let entry = combined.entry(card.clone()).or_default();
            for (other, count) in others {
                *entry.entry(other.clone()).or_insert(0) += count;
            }
        }
        combined
    }
}
