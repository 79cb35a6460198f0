//! Subscriber notifier — streaming "observe, deliver, wait, repeat" loop.
//!
//! DESIGN
//! ======
//! Subscribers do not get their own queue. Each one keeps only the last
//! version it delivered; when the shared change signal fires it re-reads the
//! whole log and sends that. A slow subscriber that misses several writes
//! simply sees the newest state on its next pass, so there is no backlog to
//! bound.
//!
//! The transport is abstracted behind `UpdateSink` so the same loop drives an
//! SSE response body in production and an in-memory collector in tests.
//!
//! LIFECYCLE
//! =========
//! 1. `stream_updates` delivers the current snapshot immediately
//! 2. Waits for the next version (no lock held, no timeout)
//! 3. Delivers again; any delivery error ends the loop for this subscriber only

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::message_log::{MessageLog, Snapshot};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("subscriber transport closed")]
    Closed,
}

/// Destination for streamed snapshots. `deliver` must flush before returning.
#[async_trait]
pub trait UpdateSink: Send {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<(), SinkError>;
}

/// Why a streaming loop stopped.
#[derive(Debug)]
pub struct StreamEnd {
    pub subscriber_id: Uuid,
    /// Snapshots successfully delivered before the loop stopped.
    pub delivered: u64,
    /// Last version handed to the sink, if any.
    pub last_version: Option<u64>,
    pub reason: SinkError,
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Per-subscriber cursor over the shared log.
pub struct Subscription {
    log: MessageLog,
    last_seen: Option<u64>,
}

impl Subscription {
    #[must_use]
    pub fn new(log: MessageLog) -> Self {
        Self { log, last_seen: None }
    }

    /// First call returns the current contents. Later calls suspend until
    /// the log has moved past the last returned version.
    pub async fn next(&mut self) -> Snapshot {
        let snapshot = match self.last_seen {
            None => self.log.snapshot(),
            Some(version) => self.log.wait_for_change(version).await,
        };
        self.last_seen = Some(snapshot.version);
        snapshot
    }

    #[must_use]
    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}

// =============================================================================
// STREAM LOOP
// =============================================================================

/// Push every log change into `sink` until delivery fails.
///
/// Delivery failure is terminal for this subscriber only; the log and other
/// subscribers are unaffected.
pub async fn stream_updates<S: UpdateSink>(log: MessageLog, mut sink: S) -> StreamEnd {
    let subscriber_id = Uuid::new_v4();
    let mut subscription = Subscription::new(log);
    let mut delivered = 0u64;
    let mut last_version = None;

    info!(%subscriber_id, "subscriber attached");
    loop {
        let snapshot = subscription.next().await;
        if let Err(reason) = sink.deliver(&snapshot).await {
            debug!(%subscriber_id, error = %reason, version = snapshot.version, "subscriber delivery failed");
            info!(%subscriber_id, delivered, "subscriber detached");
            return StreamEnd { subscriber_id, delivered, last_version, reason };
        }
        delivered += 1;
        last_version = Some(snapshot.version);
    }
}

#[cfg(test)]
#[path = "notifier_test.rs"]
mod tests;
