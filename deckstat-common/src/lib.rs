//! # deckstat common library
//!
//! Shared code for the deckstat crates:
//! - Error and Result types
//! - Layered configuration (CLI → ENV → TOML → compiled defaults)
//! - Pipeline event types and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{DeckClass, EventBus, PipelineEvent, PipelinePhase};
