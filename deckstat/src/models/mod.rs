//! Data models for deckstat
//!
//! - Catalog resource kinds
//! - Card and deck records parsed from catalog documents

pub mod card;
pub mod deck;
pub mod resource;

pub use card::CardRecord;
pub use deck::{DeckRecord, Slots, RANDOM_BASIC_WEAKNESS};
pub use resource::ResourceKind;
