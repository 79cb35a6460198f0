use super::*;
use crate::services::message_log::DEFAULT_WELCOME;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

/// Forwards snapshots into a channel; fails once `remaining` hits zero.
struct ChannelSink {
    tx: mpsc::Sender<Snapshot>,
    remaining: Option<usize>,
}

#[async_trait]
impl UpdateSink for ChannelSink {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(SinkError::Closed);
            }
            *remaining -= 1;
        }
        self.tx.send(snapshot.clone()).await.map_err(|_| SinkError::Closed)
    }
}

struct RecordingSink {
    seen: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl UpdateSink for RecordingSink {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        self.seen.lock().expect("mutex should lock").push(snapshot.version);
        Ok(())
    }
}

async fn recv(rx: &mut mpsc::Receiver<Snapshot>) -> Snapshot {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("snapshot receive timed out")
        .expect("sink channel closed unexpectedly")
}

// =============================================================================
// Subscription
// =============================================================================

#[tokio::test]
async fn first_next_returns_current_contents() {
    let log = MessageLog::default();
    log.append("<p>a</p>".into());

    let mut sub = Subscription::new(log);
    assert_eq!(sub.last_seen(), None);
    let snap = timeout(Duration::from_millis(100), sub.next())
        .await
        .expect("first next should not block");
    assert_eq!(snap.len(), 2);
    assert_eq!(sub.last_seen(), Some(1));
}

#[tokio::test]
async fn second_next_waits_for_a_write() {
    let log = MessageLog::default();
    let mut sub = Subscription::new(log.clone());
    sub.next().await;

    assert!(timeout(Duration::from_millis(50), sub.next()).await.is_err());

    log.append("<p>b</p>".into());
    let snap = timeout(Duration::from_millis(500), sub.next())
        .await
        .expect("write should wake subscription");
    assert_eq!(snap.version, 1);
}

#[tokio::test]
async fn writes_between_reads_coalesce() {
    let log = MessageLog::default();
    let mut sub = Subscription::new(log.clone());
    sub.next().await;

    log.append("<p>1</p>".into());
    log.append("<p>2</p>".into());
    log.append("<p>3</p>".into());

    let snap = sub.next().await;
    assert_eq!(snap.version, 3);
    assert_eq!(snap.len(), 4);
    assert!(timeout(Duration::from_millis(50), sub.next()).await.is_err());
}

// =============================================================================
// stream_updates
// =============================================================================

#[tokio::test]
async fn stream_delivers_initial_snapshot_then_changes() {
    let log = MessageLog::default();
    let (tx, mut rx) = mpsc::channel(4);
    let handle = tokio::spawn(stream_updates(log.clone(), ChannelSink { tx, remaining: None }));

    let first = recv(&mut rx).await;
    assert_eq!(first.records, vec![DEFAULT_WELCOME.to_string()]);

    log.append("<p>hello</p>".into());
    let second = recv(&mut rx).await;
    assert_eq!(second.joined(), format!("{DEFAULT_WELCOME}<p>hello</p>"));

    log.reset();
    let third = recv(&mut rx).await;
    assert_eq!(third.len(), 1);

    handle.abort();
}

#[tokio::test]
async fn stream_ends_when_transport_closes() {
    let log = MessageLog::default();
    let (tx, mut rx) = mpsc::channel(4);
    let handle = tokio::spawn(stream_updates(log.clone(), ChannelSink { tx, remaining: None }));

    recv(&mut rx).await;
    drop(rx);
    log.append("<p>nobody listening</p>".into());

    let end = timeout(Duration::from_millis(500), handle)
        .await
        .expect("stream should end after transport closes")
        .expect("stream task panicked");
    assert_eq!(end.delivered, 1);
    assert_eq!(end.last_version, Some(0));
    assert!(matches!(end.reason, SinkError::Closed));

    // The log keeps working for everyone else.
    log.append("<p>still fine</p>".into());
    assert_eq!(log.len(), 3);
}

#[tokio::test]
async fn failing_subscriber_does_not_affect_others() {
    let log = MessageLog::default();
    let (bad_tx, _bad_rx) = mpsc::channel(4);
    let (good_tx, mut good_rx) = mpsc::channel(4);

    let bad = tokio::spawn(stream_updates(log.clone(), ChannelSink { tx: bad_tx, remaining: Some(1) }));
    let good = tokio::spawn(stream_updates(log.clone(), ChannelSink { tx: good_tx, remaining: None }));

    recv(&mut good_rx).await;
    log.append("<p>x</p>".into());

    let end = timeout(Duration::from_millis(500), bad)
        .await
        .expect("bad subscriber should stop")
        .expect("stream task panicked");
    assert!(matches!(end.reason, SinkError::Closed));
    assert_eq!(end.delivered, 1);
    assert_eq!(end.last_version, Some(0));

    let snap = recv(&mut good_rx).await;
    assert_eq!(snap.version, 1);
    good.abort();
}

#[tokio::test]
async fn stream_observes_final_version_under_burst() {
    let log = MessageLog::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = tokio::spawn(stream_updates(log.clone(), RecordingSink { seen: seen.clone() }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    for i in 0..100 {
        log.append(format!("<p>{i}</p>"));
    }

    timeout(Duration::from_millis(500), async {
        loop {
            if seen.lock().expect("mutex should lock").last() == Some(&100) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber should observe the latest version");

    let versions = seen.lock().expect("mutex should lock").clone();
    assert!(versions.windows(2).all(|w| w[0] < w[1]), "versions must be strictly increasing");
    handle.abort();
}
