//! In-memory catalog
//!
//! Serves canned documents, counts every request per key, and can fail a
//! key a set number of times before answering or delay every response.

use async_trait::async_trait;
use deckstat::models::ResourceKind;
use deckstat::services::{CatalogApi, CatalogError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type Key = (ResourceKind, String);

#[derive(Default)]
pub struct FakeCatalog {
    documents: Mutex<HashMap<Key, String>>,
    failures: Mutex<HashMap<Key, u32>>,
    hits: Mutex<HashMap<Key, usize>>,
    latency: Duration,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response waits `latency` first
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn add_raw(&self, kind: ResourceKind, id: &str, body: &str) {
        self.documents
            .lock()
            .unwrap()
            .insert((kind, id.to_string()), body.to_string());
    }

    pub fn add_card(&self, code: &str, name: &str, xp: Option<i64>) {
        let mut card = json!({ "code": code, "name": name, "text": format!("{} text", name) });
        if let Some(xp) = xp {
            card["xp"] = json!(xp);
        }
        self.add_raw(ResourceKind::Card, code, &card.to_string());
    }

    pub fn add_encounter_card(&self, code: &str, name: &str) {
        let card = json!({ "code": code, "name": name, "encounter_code": "torch" });
        self.add_raw(ResourceKind::Card, code, &card.to_string());
    }

    pub fn add_investigator(&self, code: &str, name: &str) {
        let card = json!({ "code": code, "name": name, "back_flavor": format!("{} back", name) });
        self.add_raw(ResourceKind::Card, code, &card.to_string());
    }

    pub fn add_deck(&self, id: u64, investigator_code: &str, slots: &[(&str, u32)]) {
        let slots: serde_json::Map<String, Value> = slots
            .iter()
            .map(|(code, qty)| (code.to_string(), json!(qty)))
            .collect();
        let deck = json!({ "id": id, "investigator_code": investigator_code, "slots": slots });
        self.add_raw(ResourceKind::Decklist, &id.to_string(), &deck.to_string());
    }

    /// Fail the next `times` requests for this key
    pub fn fail_times(&self, kind: ResourceKind, id: &str, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert((kind, id.to_string()), times);
    }

    pub fn hits(&self, kind: ResourceKind, id: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<String, CatalogError> {
        let key = (kind, id.to_string());
        *self.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(CatalogError::Status(500, "injected failure".to_string()));
                }
            }
        }

        self.documents
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| CatalogError::Status(404, "Not Found".to_string()))
    }
}
