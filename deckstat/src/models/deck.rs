//! Deck records

use crate::models::ResourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Card code → quantity, ordered by code
pub type Slots = BTreeMap<String, u32>;

/// "Random basic weakness" placeholder code, never counted
pub const RANDOM_BASIC_WEAKNESS: &str = "01000";

/// A decklist as fetched from the catalog
///
/// Transient: lives only while one worker processes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRecord {
    pub id: u64,
    pub investigator_code: String,
    pub slots: Slots,
}

impl DeckRecord {
    /// Parse a catalog decklist document
    ///
    /// Returns `None` when the document has no usable investigator code,
    /// which makes the deck unusable for affinity statistics. Slot entries
    /// with a malformed code, or whose quantity is not a positive integer,
    /// are dropped.
    pub fn from_json(requested_id: u64, value: &Value) -> Option<Self> {
        let investigator_code = value
            .get("investigator_code")
            .and_then(Value::as_str)
            .filter(|s| ResourceKind::is_valid_id(s))?
            .to_string();

        let id = value.get("id").and_then(Value::as_u64).unwrap_or(requested_id);

        let mut slots = Slots::new();
        if let Some(entries) = value.get("slots").and_then(Value::as_object) {
            for (code, quantity) in entries {
                if !ResourceKind::is_valid_id(code) {
                    tracing::debug!(deck_id = id, code = %code, "Dropping slot with malformed card code");
                    continue;
                }
                match quantity.as_u64().and_then(|q| u32::try_from(q).ok()) {
                    Some(q) if q > 0 => {
                        slots.insert(code.clone(), q);
                    }
                    _ => {
                        tracing::debug!(deck_id = id, code = %code, "Dropping slot with unusable quantity");
                    }
                }
            }
        }

        Some(Self {
            id,
            investigator_code,
            slots,
        })
    }
}
