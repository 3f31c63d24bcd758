//! Utility modules for deckstat

pub mod retry;

pub use retry::{retry, Backoff, RetryPolicy};
