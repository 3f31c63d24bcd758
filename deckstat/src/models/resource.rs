//! Catalog resource kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of document served by the remote catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Card,
    Decklist,
}

impl ResourceKind {
    /// Path segment in `GET {base_url}/{segment}/{id}.json`
    pub fn api_segment(&self) -> &'static str {
        match self {
            ResourceKind::Card => "card",
            ResourceKind::Decklist => "decklist",
        }
    }

    /// Catalog ids are plain ASCII alphanumerics
    ///
    /// Anything else (separators, dots, whitespace) would escape the store
    /// directory or the API path, so such ids are never fetched.
    pub fn is_valid_id(id: &str) -> bool {
        !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    /// Directory holding this kind in the durable store
    pub fn store_dir(&self) -> &'static str {
        match self {
            ResourceKind::Card => "cards",
            ResourceKind::Decklist => "decks",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_segment())
    }
}
