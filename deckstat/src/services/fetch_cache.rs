//! Cache-aside fetch layer
//!
//! Resolves `(kind, id)` to a JSON document:
//! 1. Durable store hit → return it, no network
//! 2. Miss → remote catalog under the retry policy
//! 3. Body must be a JSON object, else the record is "missing"
//! 4. Persist before returning
//!
//! Remote failures never escape: after the last attempt the record is
//! "missing" (`Ok(None)`). Only a broken store is an error.

use crate::models::ResourceKind;
use crate::services::catalog_client::CatalogApi;
use crate::services::record_store::RecordStore;
use crate::utils::{retry, RetryPolicy};
use deckstat_common::Result;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Store-first fetcher shared by all workers
pub struct FetchCache {
    store: Arc<RecordStore>,
    client: Arc<dyn CatalogApi>,
    policy: RetryPolicy,
    remote_fetches: AtomicUsize,
}

impl FetchCache {
    pub fn new(store: Arc<RecordStore>, client: Arc<dyn CatalogApi>, policy: RetryPolicy) -> Self {
        Self {
            store,
            client,
            policy,
            remote_fetches: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Number of fetches that had to go to the remote catalog
    pub fn remote_fetches(&self) -> usize {
        self.remote_fetches.load(Ordering::Relaxed)
    }

    /// Fetch one record
    ///
    /// `Ok(None)` means the catalog has no usable document for this id.
    /// Malformed ids are `None` without touching the store or the network.
    pub async fn fetch(&self, kind: ResourceKind, id: &str) -> Result<Option<Value>> {
        if !ResourceKind::is_valid_id(id) {
            tracing::warn!(kind = %kind, id = %id, "Refusing to fetch malformed id");
            return Ok(None);
        }

        if let Some(value) = self.store.load(kind, id).await? {
            tracing::trace!(kind = %kind, id = %id, "Store hit");
            return Ok(Some(value));
        }

        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
        let operation_name = format!("{}/{}", kind, id);

        let body = match retry(&operation_name, &self.policy, || self.client.get(kind, id)).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(kind = %kind, id = %id, error = %e, "Record unavailable");
                return Ok(None);
            }
        };

        let value = match serde_json::from_str::<Value>(&body) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                tracing::warn!(kind = %kind, id = %id, "Catalog body is not a JSON object");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(kind = %kind, id = %id, error = %e, "Catalog body is not valid JSON");
                return Ok(None);
            }
        };

        self.store.save(kind, id, &value).await?;
        Ok(Some(value))
    }
}
