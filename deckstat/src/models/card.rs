//! Card records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Card metadata as used by normalization, level computation and reports
///
/// Parsed leniently from the catalog document: the catalog is not strict
/// about types, so a field with an unexpected type is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Card code (e.g. "01001")
    pub code: String,
    /// Experience cost, only when the catalog gives an integer
    pub xp: Option<i64>,
    /// Set for non-player (encounter) cards
    pub encounter_code: Option<String>,
    /// Display name
    pub name: String,
    /// Flavor or rules text shown in reports
    pub display_text: String,
    /// Code used to build the card image URL
    pub image_code: String,
}

impl CardRecord {
    /// Parse a catalog card document
    pub fn from_json(code: &str, value: &Value) -> Self {
        let xp = value.get("xp").and_then(Value::as_i64);

        let encounter_code = value
            .get("encounter_code")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let name = value
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(code)
            .to_string();

        let display_text = ["back_flavor", "flavor", "text"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        let image_code = value
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or(code)
            .to_string();

        Self {
            code: code.to_string(),
            xp,
            encounter_code,
            name,
            display_text,
            image_code,
        }
    }

    /// Stand-in for a code the catalog does not know
    pub fn placeholder(code: &str) -> Self {
        Self {
            code: code.to_string(),
            xp: None,
            encounter_code: None,
            name: code.to_string(),
            display_text: String::new(),
            image_code: code.to_string(),
        }
    }

    /// Non-player cards never count towards deck statistics
    pub fn is_encounter(&self) -> bool {
        self.encounter_code.is_some()
    }

    /// Experience cost, 0 when unknown
    pub fn xp_or_zero(&self) -> i64 {
        self.xp.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_player_card() {
        let card = CardRecord::from_json(
            "01030",
            &json!({
                "code": "01030",
                "name": "Magnifying Glass",
                "xp": 0,
                "text": "Fast.",
            }),
        );

        assert_eq!(card.name, "Magnifying Glass");
        assert_eq!(card.xp, Some(0));
        assert!(!card.is_encounter());
        assert_eq!(card.display_text, "Fast.");
    }

    #[test]
    fn test_non_numeric_xp_is_absent() {
        let card = CardRecord::from_json("01001", &json!({ "xp": "2", "name": "X" }));
        assert_eq!(card.xp, None);
        assert_eq!(card.xp_or_zero(), 0);
    }

    #[test]
    fn test_encounter_card() {
        let card = CardRecord::from_json(
            "01160",
            &json!({ "name": "Ghoul Minion", "encounter_code": "ghouls" }),
        );
        assert!(card.is_encounter());
    }

    #[test]
    fn test_back_flavor_preferred_for_display_text() {
        let card = CardRecord::from_json(
            "01001",
            &json!({
                "name": "Roland Banks",
                "back_flavor": "He was no stranger to the unknown.",
                "text": "Reaction ability",
            }),
        );
        assert_eq!(card.display_text, "He was no stranger to the unknown.");
    }

    #[test]
    fn test_placeholder_uses_code_as_name() {
        let card = CardRecord::placeholder("99999");
        assert_eq!(card.name, "99999");
        assert!(card.xp.is_none());
        assert!(!card.is_encounter());
    }
}
