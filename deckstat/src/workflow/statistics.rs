//! Run statistics
//!
//! Lock-free counters updated by every worker, read back as a serializable
//! snapshot once the run finishes.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared counters for one pipeline run
#[derive(Debug, Default)]
pub struct RunStatistics {
    ids_queued: AtomicUsize,
    decks_missing: AtomicUsize,
    decks_invalid: AtomicUsize,
    unique_decks: AtomicUsize,
    duplicate_decks: AtomicUsize,
    replaced_decks: AtomicUsize,
    base_decks: AtomicUsize,
    experience_decks: AtomicUsize,
    reports_written: AtomicUsize,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ids_queued(&self, count: usize) {
        self.ids_queued.store(count, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.decks_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.decks_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_decks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replaced(&self) {
        self.replaced_decks.fetch_add(1, Ordering::Relaxed);
    }

    /// A unique deck aggregated into the base or experience table
    pub fn record_unique(&self, experience: bool) {
        self.unique_decks.fetch_add(1, Ordering::Relaxed);
        if experience {
            self.experience_decks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.base_decks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_report(&self) {
        self.reports_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, elapsed_ms: u64) -> RunStatisticsSnapshot {
        RunStatisticsSnapshot {
            ids_queued: self.ids_queued.load(Ordering::Relaxed),
            decks_missing: self.decks_missing.load(Ordering::Relaxed),
            decks_invalid: self.decks_invalid.load(Ordering::Relaxed),
            unique_decks: self.unique_decks.load(Ordering::Relaxed),
            duplicate_decks: self.duplicate_decks.load(Ordering::Relaxed),
            replaced_decks: self.replaced_decks.load(Ordering::Relaxed),
            base_decks: self.base_decks.load(Ordering::Relaxed),
            experience_decks: self.experience_decks.load(Ordering::Relaxed),
            reports_written: self.reports_written.load(Ordering::Relaxed),
            elapsed_ms,
        }
    }
}

/// Point-in-time copy of `RunStatistics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatisticsSnapshot {
    pub ids_queued: usize,
    pub decks_missing: usize,
    pub decks_invalid: usize,
    pub unique_decks: usize,
    pub duplicate_decks: usize,
    pub replaced_decks: usize,
    pub base_decks: usize,
    pub experience_decks: usize,
    pub reports_written: usize,
    pub elapsed_ms: u64,
}

impl RunStatisticsSnapshot {
    /// Decks that were fetched and parsed (unique + duplicated)
    pub fn total_decks(&self) -> usize {
        self.unique_decks + self.duplicate_decks
    }

    pub fn display_string(&self) -> String {
        format!(
            "Unique decks: {}, duplicated decks: {}, total: {} ({} base, {} with experience, {} missing, {} invalid)",
            self.unique_decks,
            self.duplicate_decks,
            self.total_decks(),
            self.base_decks,
            self.experience_decks,
            self.decks_missing,
            self.decks_invalid
        )
    }
}
