//! Variant → canonical card code table
//!
//! Loaded once before processing and read-only afterwards. Chains are
//! resolved at load time so every value is a canonical code, which keeps
//! canonicalization idempotent.

use deckstat_common::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::Path;

/// Immutable variant → canonical mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateMap {
    canonical: BTreeMap<String, String>,
}

impl DuplicateMap {
    /// Build from raw `variant → target` pairs, resolving chains
    ///
    /// **Algorithm:**
    /// 1. Follow `target` while it is itself a variant
    /// 2. Stop at the first code seen twice (cycle); the smallest code of
    ///    the cycle becomes canonical so the result is deterministic
    /// 3. Drop identity entries
    pub fn new(raw: BTreeMap<String, String>) -> Self {
        let mut canonical = BTreeMap::new();

        for variant in raw.keys() {
            let mut path = vec![variant.clone()];
            let mut current = variant.clone();

            while let Some(next) = raw.get(&current) {
                if let Some(start) = path.iter().position(|code| code == next) {
                    let cycle: BTreeSet<&String> = path[start..].iter().collect();
                    let smallest = cycle.into_iter().next().cloned().unwrap_or_else(|| next.clone());
                    tracing::warn!(variant = %variant, "Cycle in duplicates table, using {}", smallest);
                    current = smallest;
                    break;
                }
                path.push(next.clone());
                current = next.clone();
            }

            if &current != variant {
                canonical.insert(variant.clone(), current);
            }
        }

        Self { canonical }
    }

    /// Load `duplicates.json` (a JSON object of code → code)
    ///
    /// A missing file yields an empty map; a malformed one is a
    /// configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "Duplicates table not found, card codes will not be canonicalized"
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::storage(path, e)),
        };

        let raw: BTreeMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid duplicates table {}: {}", path.display(), e))
        })?;

        let map = Self::new(raw);
        tracing::info!(entries = map.len(), "Duplicates table loaded");
        Ok(map)
    }

    /// Canonical code for `code` (itself when not a variant)
    pub fn canonical<'a>(&'a self, code: &'a str) -> &'a str {
        self.canonical.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for DuplicateMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(variant, target)| (variant.to_string(), target.to_string()))
                .collect(),
        )
    }
}
