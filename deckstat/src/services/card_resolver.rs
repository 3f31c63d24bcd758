//! Card metadata resolver
//!
//! Process-wide memo of card records over the fetch cache. Each code gets
//! its own `OnceCell`: the first caller runs the fetch, concurrent callers
//! for the same code await that same fetch, and later callers read the
//! memoized record. At most one fetch per distinct code is ever in flight.

use crate::models::{CardRecord, ResourceKind};
use crate::services::fetch_cache::FetchCache;
use deckstat_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type CardCell = Arc<OnceCell<Arc<CardRecord>>>;

/// Memoized, single-flight card lookup
pub struct CardResolver {
    cache: Arc<FetchCache>,
    cards: Mutex<HashMap<String, CardCell>>,
}

impl CardResolver {
    pub fn new(cache: Arc<FetchCache>) -> Self {
        Self {
            cache,
            cards: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a card code
    ///
    /// Unknown codes resolve to `CardRecord::placeholder`; only a storage
    /// failure is an error. A failed initialization leaves the cell empty,
    /// so the next caller retries.
    pub async fn get_card(&self, code: &str) -> Result<Arc<CardRecord>> {
        let cell = self.cell_for(code)?;

        let card = cell
            .get_or_try_init(|| async {
                let card = match self.cache.fetch(ResourceKind::Card, code).await? {
                    Some(value) => CardRecord::from_json(code, &value),
                    None => {
                        tracing::warn!(code = %code, "Unknown card, using placeholder");
                        CardRecord::placeholder(code)
                    }
                };
                Ok::<_, Error>(Arc::new(card))
            })
            .await?;

        Ok(Arc::clone(card))
    }

    /// Number of codes resolved so far
    pub fn resolved_count(&self) -> Result<usize> {
        let cards = self
            .cards
            .lock()
            .map_err(|_| Error::Internal("card memo lock poisoned".to_string()))?;
        Ok(cards.values().filter(|cell| cell.initialized()).count())
    }

    fn cell_for(&self, code: &str) -> Result<CardCell> {
        let mut cards = self
            .cards
            .lock()
            .map_err(|_| Error::Internal("card memo lock poisoned".to_string()))?;
        Ok(Arc::clone(
            cards
                .entry(code.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        ))
    }
}
