//! In-memory bot statistics.
//!
//! An explicit sink handed to the message pipeline rather than
//! process-global counters. Updated only at the pipeline boundary; the
//! resolver never touches it. Counters reset with the process.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Aggregate counters since process start.
#[derive(Debug)]
pub struct BotStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
    users: Mutex<HashSet<String>>,
    last_success: Mutex<Option<DateTime<Utc>>>,
    started_at: DateTime<Utc>,
}

/// Point-in-time view, feeds the /stats reply.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    pub users_served: usize,
    pub last_success: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

impl BotStats {
    pub fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            users: Mutex::new(HashSet::new()),
            last_success: Mutex::new(None),
            started_at: Utc::now(),
        }
    }

    /// Remember a sender; each counts once for the process lifetime.
    pub fn record_user(&self, user_id: &str) {
        self.users.lock().unwrap().insert(user_id.to_string());
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        *self.last_success.lock().unwrap() = Some(Utc::now());
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            users_served: self.users.lock().unwrap().len(),
            last_success: *self.last_success.lock().unwrap(),
            started_at: self.started_at,
        }
    }
}

impl Default for BotStats {
    fn default() -> Self {
        Self::new()
    }
}
