//! deckstat library interface
//!
//! Exposes the pipeline components for the binary and integration tests.

pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

pub use workflow::{PipelineOrchestrator, RunSummary};
