//! Aggregate export
//!
//! Writes the finished tables as key-sorted, pretty-printed JSON documents
//! into the output directory.

use crate::services::affinity::AffinitySnapshot;
use deckstat_common::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const BASE_INVESTIGATOR_FILE: &str = "aff_inv.json";
pub const EXPERIENCE_INVESTIGATOR_FILE: &str = "aff_inv_xp.json";
pub const CARD_AFFINITY_FILE: &str = "aff_cards.json";
pub const DECK_GROUPS_FILE: &str = "decks_grouped_by_hash.json";

/// Writer for the aggregate documents
pub struct AggregateExporter {
    output_dir: PathBuf,
}

impl AggregateExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write all four documents, returning their paths
    pub async fn export(
        &self,
        snapshot: &AffinitySnapshot,
        deck_groups: &BTreeMap<String, Vec<u64>>,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| Error::storage(&self.output_dir, e))?;

        let written = vec![
            self.write_json(BASE_INVESTIGATOR_FILE, &snapshot.base.investigators)
                .await?,
            self.write_json(EXPERIENCE_INVESTIGATOR_FILE, &snapshot.experience.investigators)
                .await?,
            self.write_json(CARD_AFFINITY_FILE, &snapshot.combined_card_affinity())
                .await?,
            self.write_json(DECK_GROUPS_FILE, deck_groups).await?,
        ];

        tracing::info!(
            output_dir = %self.output_dir.display(),
            files = written.len(),
            "Aggregates exported"
        );
        Ok(written)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let content = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| Error::storage(&path, e))?;
        tracing::debug!(path = %path.display(), "Aggregate written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Slots;
    use crate::services::affinity::AffinityAggregator;
    use deckstat_common::DeckClass;
    use serde_json::Value;
    use tempfile::TempDir;

    fn slots(entries: &[(&str, u32)]) -> Slots {
        entries.iter().map(|(c, q)| (c.to_string(), *q)).collect()
    }

    #[tokio::test]
    async fn test_export_writes_all_documents() {
        let dir = TempDir::new().unwrap();
        let aggregator = AffinityAggregator::new();
        aggregator
            .record(DeckClass::Base, "01001", &slots(&[("01030", 2), ("01031", 1)]))
            .unwrap();
        aggregator
            .record(DeckClass::Experience, "01002", &slots(&[("01030", 1), ("01031", 1)]))
            .unwrap();
        let snapshot = aggregator.into_snapshot().unwrap();

        let mut groups = BTreeMap::new();
        groups.insert("abc".to_string(), vec![1, 4]);

        let exporter = AggregateExporter::new(dir.path().join("out"));
        let written = exporter.export(&snapshot, &groups).await.unwrap();
        assert_eq!(written.len(), 4);

        let read = |name: &str| -> Value {
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("out").join(name)).unwrap())
                .unwrap()
        };

        assert_eq!(read(BASE_INVESTIGATOR_FILE)["01001"]["01030"], 1);
        assert!(read(BASE_INVESTIGATOR_FILE).get("01002").is_none());
        assert_eq!(read(EXPERIENCE_INVESTIGATOR_FILE)["01002"]["01031"], 1);
        assert_eq!(read(CARD_AFFINITY_FILE)["01030"]["01031"], 2);
        assert_eq!(read(DECK_GROUPS_FILE)["abc"], serde_json::json!([1, 4]));
    }
}
