//! Test Helper Utilities
//!
//! Shared utilities for testing deckstat

#![allow(dead_code)]

pub mod fake_catalog;
pub mod store_utils;

pub use fake_catalog::FakeCatalog;
pub use store_utils::{
    create_fetch_cache, create_resolver, create_test_orchestrator, create_test_store, test_config,
};
