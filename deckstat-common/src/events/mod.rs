//! Pipeline event types and EventBus
//!
//! Informational events are broadcast so that progress displays and tests can
//! observe the pipeline without coupling to it. None of these events is an
//! error; failing to deliver one never affects processing.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which affinity table a deck was aggregated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckClass {
    /// Deck spent no experience
    Base,
    /// Deck spent experience
    Experience,
}

impl DeckClass {
    /// Route a deck by its total experience
    pub fn from_level(level: i64) -> Self {
        if level > 0 {
            DeckClass::Experience
        } else {
            DeckClass::Base
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeckClass::Base => "base",
            DeckClass::Experience => "experience",
        }
    }
}

/// Pipeline phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// Fetch, normalize, dedup and aggregate decks
    Collecting,
    /// Per-investigator reports over the base table
    BaseReports,
    /// Per-investigator reports over the experience table
    ExperienceReports,
}

impl PipelinePhase {
    pub fn label(&self) -> &'static str {
        match self {
            PipelinePhase::Collecting => "collecting",
            PipelinePhase::BaseReports => "base reports",
            PipelinePhase::ExperienceReports => "experience reports",
        }
    }
}

/// deckstat event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A phase started with `items` queued
    PhaseStarted {
        phase: PipelinePhase,
        items: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every worker of a phase has terminated
    PhaseCompleted {
        phase: PipelinePhase,
        processed: usize,
        elapsed_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// No decklist exists for this id (or it could not be fetched)
    DeckMissing { deck_id: u64 },

    /// Variant card codes in a deck were replaced by their canonical codes
    CardsReplaced { deck_id: u64 },

    /// Deck content matches an already registered deck
    DuplicateDeck {
        deck_id: u64,
        content_hash: String,
        /// Ids registered under the hash before this deck
        existing: Vec<u64>,
    },

    /// Deck was aggregated into one affinity table
    DeckAggregated {
        deck_id: u64,
        investigator_code: String,
        class: DeckClass,
        level: i64,
    },
}

/// Broadcast bus for `PipelineEvent`s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_class_routing() {
        assert_eq!(DeckClass::from_level(0), DeckClass::Base);
        assert_eq!(DeckClass::from_level(-2), DeckClass::Base);
        assert_eq!(DeckClass::from_level(1), DeckClass::Experience);
    }

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(PipelineEvent::DeckMissing { deck_id: 7 });
        assert!(bus.emit(PipelineEvent::DeckMissing { deck_id: 7 }).is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(PipelineEvent::CardsReplaced { deck_id: 42 });

        match rx.recv().await.unwrap() {
            PipelineEvent::CardsReplaced { deck_id } => assert_eq!(deck_id, 42),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(PipelineEvent::DeckMissing { deck_id: 3 }).unwrap();
        assert_eq!(json["type"], "DeckMissing");
        assert_eq!(json["deck_id"], 3);
    }
}
