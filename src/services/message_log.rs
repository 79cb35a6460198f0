//! Message log — the shared, ordered chat history.
//!
//! DESIGN
//! ======
//! Records live in a `Vec<String>` behind a `std::sync::RwLock`, paired with
//! a version counter that every mutation bumps. The lock is only ever held
//! for the duration of a push, a truncate, or a clone; it never crosses an
//! `.await`, so writers cannot be starved by a subscriber stuck on network I/O.
//!
//! Change notification is a single `tokio::sync::watch` channel carrying the
//! latest version. A watch channel is a broadcast condition: every receiver
//! observes every send (coalesced to the newest value), and waiting on it
//! suspends the task instead of the runtime thread.
//!
//! INVARIANTS
//! ==========
//! - Index 0 is the welcome entry; `reset` never removes it.
//! - Records are never mutated after append.
//! - The version increases by exactly one per append or reset.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

/// Default system line shown at the top of a fresh log.
pub const DEFAULT_WELCOME: &str = "<p>[SYSTEM] Welcome to my chat room!</p>";

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Point-in-time copy of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Log version this copy was taken at.
    pub version: u64,
    /// Records in display order, welcome entry first.
    pub records: Vec<String>,
}

impl Snapshot {
    /// Concatenate every record with no separator.
    #[must_use]
    pub fn joined(&self) -> String {
        self.records.concat()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// MESSAGE LOG
// =============================================================================

struct LogInner {
    records: Vec<String>,
    version: u64,
}

/// Shared append-only log. Clone is cheap; clones observe the same log.
#[derive(Clone)]
pub struct MessageLog {
    inner: Arc<RwLock<LogInner>>,
    changes: Arc<watch::Sender<u64>>,
}

impl MessageLog {
    /// Create a log holding only `welcome`.
    #[must_use]
    pub fn new(welcome: impl Into<String>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(LogInner { records: vec![welcome.into()], version: 0 })),
            changes: Arc::new(changes),
        }
    }

    /// Append one rendered record and wake every waiter.
    ///
    /// Callers bound the record length; the log accepts anything.
    pub fn append(&self, record: String) -> u64 {
        let version = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.records.push(record);
            inner.version += 1;
            inner.version
        };
        self.changes.send_replace(version);
        version
    }

    /// Truncate back to the welcome entry and wake every waiter.
    pub fn reset(&self) -> u64 {
        let version = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.records.truncate(1);
            inner.version += 1;
            inner.version
        };
        self.changes.send_replace(version);
        version
    }

    /// Copy the current contents under shared access.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Snapshot { version: inner.version, records: inner.records.clone() }
    }

    /// Suspend until the log version differs from `last_seen`, then return
    /// the new contents.
    ///
    /// The receiver is registered before the version check, so a write that
    /// lands between the check and the wait still wakes this task.
    pub async fn wait_for_change(&self, last_seen: u64) -> Snapshot {
        let mut rx = self.changes.subscribe();
        loop {
            let snapshot = self.snapshot();
            if snapshot.version != last_seen {
                return snapshot;
            }
            // The sender lives as long as `self`, so this only errors if the
            // log is being torn down underneath us.
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).records.len()
    }

    /// Always false: the welcome entry cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The permanent first record.
    #[must_use]
    pub fn welcome(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.first().cloned().unwrap_or_default()
    }

    /// Number of tasks currently able to observe change notifications.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_WELCOME)
    }
}

#[cfg(test)]
#[path = "message_log_test.rs"]
mod tests;
