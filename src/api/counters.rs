// src/api/counters.rs
//! Process-scoped usage counters.
//!
//! The transport increments these on every attempt so callers can watch
//! their API budget. The struct is injected at construction rather than
//! living in a global, so tests get a throwaway instance and the host can
//! share one across operations if it wants a workspace-wide total.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Attempt counters, safe under concurrent dispatch.
///
/// Reset only when the owning process restarts; the client itself never
/// zeroes them.
#[derive(Debug, Default)]
pub struct UsageCounters {
    requests_made: AtomicU64,
    errors_made: AtomicU64,
}

impl UsageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request attempt, success or failure.
    pub fn record_attempt(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed attempt.
    pub fn record_error(&self) {
        self.errors_made.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_made(&self) -> u64 {
        self.requests_made.load(Ordering::Relaxed)
    }

    pub fn errors_made(&self) -> u64 {
        self.errors_made.load(Ordering::Relaxed)
    }

    /// A consistent-enough copy for reporting.
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            requests_made: self.requests_made(),
            errors_made: self.errors_made(),
        }
    }
}

/// Point-in-time counter values, serializable for the hosting framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub requests_made: u64,
    pub errors_made: u64,
}
