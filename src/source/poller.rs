//! Keyset poller that turns new table rows into feed transfers.
//!
//! The cursor is the [`TransferPosition`] of the last row published. Each
//! poll pages through the rows strictly after it, in chain order, until a
//! page comes back short. Positions are unique, so every page makes
//! progress however many rows share a block or timestamp, and a row is
//! never published twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::{TransferFeed, TransferSource};
use crate::domain::{TransferEvent, TransferPosition};
use crate::error::GatewayError;

/// Polls a [`TransferSource`] and publishes new transfers on a
/// [`TransferFeed`], at most once each per poller lifetime.
#[derive(Debug)]
pub struct TransferPoller {
    source: Arc<dyn TransferSource>,
    feed: TransferFeed,
    interval: Duration,
    batch_size: i64,
    start_timestamp: Option<i64>,
    primed: bool,
    cursor: Option<TransferPosition>,
}

impl TransferPoller {
    /// Creates a poller that starts after the newest stored row.
    #[must_use]
    pub fn new(
        source: Arc<dyn TransferSource>,
        feed: TransferFeed,
        interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            source,
            feed,
            interval,
            batch_size: batch_size.max(1),
            start_timestamp: None,
            primed: false,
            cursor: None,
        }
    }

    /// Delivers stored rows from `timestamp` on instead of only new ones.
    #[must_use]
    pub fn starting_at(mut self, timestamp: Option<i64>) -> Self {
        self.start_timestamp = timestamp;
        self
    }

    /// Position of the last row published, or of the newest row present
    /// at startup.
    #[must_use]
    pub const fn cursor(&self) -> Option<TransferPosition> {
        self.cursor
    }

    /// Sets the cursor without publishing anything.
    ///
    /// With no start timestamp the rows present now are treated as already
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the source fails.
    pub async fn prime(&mut self) -> Result<(), GatewayError> {
        self.cursor = match self.start_timestamp {
            Some(start) => Some(TransferPosition::start_of(start)),
            None => self.source.latest_position().await?,
        };
        self.primed = true;
        tracing::info!(cursor = ?self.cursor, "transfer cursor initialized");
        Ok(())
    }

    /// Publishes every transfer stored since the last poll. Returns how
    /// many were published.
    ///
    /// The first call only primes the cursor, unless a start timestamp is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the source fails. The
    /// cursor keeps whatever progress was made before the failure.
    pub async fn poll_once(&mut self) -> Result<usize, GatewayError> {
        if !self.primed {
            self.prime().await?;
            if self.start_timestamp.is_none() {
                return Ok(0);
            }
        }

        let mut published = 0;
        loop {
            let rows = self.source.fetch_after(self.cursor, self.batch_size).await?;
            let full_page = i64::try_from(rows.len()).is_ok_and(|n| n >= self.batch_size);
            let Some(last) = rows.last().map(TransferEvent::position) else {
                break;
            };
            published += rows.len();
            for row in &rows {
                tracing::debug!(
                    tx = %row.transaction_hash,
                    block = row.block_number,
                    log = row.log_index,
                    recipient = %row.recipient,
                    "publishing transfer"
                );
            }
            self.feed.publish_batch(rows);
            self.cursor = Some(last);

            if !full_page {
                break;
            }
        }

        if published > 0 {
            tracing::info!(count = published, cursor = ?self.cursor, "new transfers detected");
        }
        Ok(published)
    }

    /// Polls every interval until `shutdown` turns `true` or its sender is
    /// dropped. Failed polls are logged and retried on the next tick.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval = ?self.interval, "transfer poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.poll_once().await {
                        tracing::error!(error = %err, "transfer poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("transfer poller stopped");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::domain::transfer_event::tests::make_event;
    use crate::source::MemorySource;

    fn row(timestamp: i64, log_index: i64, tx: &str) -> TransferEvent {
        let mut event = make_event("0xabc", "1000000000000000000", Some("random-number"));
        event.timestamp = timestamp;
        event.block_number = timestamp;
        event.log_index = log_index;
        event.transaction_hash = tx.to_string();
        event
    }

    fn drain(rx: &mut broadcast::Receiver<TransferEvent>) -> Vec<String> {
        let mut txs = Vec::new();
        while let Ok(event) = rx.try_recv() {
            txs.push(event.transaction_hash);
        }
        txs
    }

    fn poller(source: &Arc<MemorySource>, feed: &TransferFeed, batch: i64) -> TransferPoller {
        let source: Arc<dyn TransferSource> = Arc::clone(source) as Arc<dyn TransferSource>;
        TransferPoller::new(source, feed.clone(), Duration::from_millis(10), batch)
    }

    #[tokio::test]
    async fn existing_rows_are_not_replayed() {
        let source = Arc::new(MemorySource::new());
        source.insert(row(10, 0, "0x01")).await;
        source.insert(row(20, 0, "0x02")).await;
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 100);

        assert_eq!(poller.poll_once().await.ok(), Some(0));
        assert_eq!(poller.poll_once().await.ok(), Some(0));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(poller.cursor(), Some(row(20, 0, "0x02").position()));
    }

    #[tokio::test]
    async fn new_rows_arrive_once_in_order() {
        let source = Arc::new(MemorySource::new());
        source.insert(row(10, 0, "0x01")).await;
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 100);
        let _ = poller.poll_once().await;

        source.insert(row(30, 0, "0x03")).await;
        source.insert(row(20, 0, "0x02")).await;
        assert_eq!(poller.poll_once().await.ok(), Some(2));
        assert_eq!(drain(&mut rx), ["0x02", "0x03"]);

        assert_eq!(poller.poll_once().await.ok(), Some(0));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn later_log_in_cursor_block_is_delivered() {
        let source = Arc::new(MemorySource::new());
        source.insert(row(10, 0, "0x01")).await;
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 100);
        let _ = poller.poll_once().await;

        source.insert(row(10, 1, "0x01b")).await;
        assert_eq!(poller.poll_once().await.ok(), Some(1));
        assert_eq!(drain(&mut rx), ["0x01b"]);
    }

    #[tokio::test]
    async fn busy_block_larger_than_batch_is_fully_delivered() {
        let source = Arc::new(MemorySource::new());
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 2);
        let _ = poller.poll_once().await;

        for (ts, log, tx) in [(1, 0, "a"), (2, 0, "b"), (2, 1, "c"), (2, 2, "d"), (3, 0, "e")] {
            source.insert(row(ts, log, tx)).await;
        }
        assert_eq!(poller.poll_once().await.ok(), Some(5));
        assert_eq!(drain(&mut rx), ["a", "b", "c", "d", "e"]);

        source.insert(row(3, 1, "f")).await;
        for _ in 0..3 {
            let _ = poller.poll_once().await;
        }
        assert_eq!(drain(&mut rx), ["f"]);
    }

    #[tokio::test]
    async fn priming_covers_a_busy_latest_block() {
        let source = Arc::new(MemorySource::new());
        for log in 0..5 {
            source.insert(row(7, log, "old")).await;
        }
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 2);

        assert_eq!(poller.poll_once().await.ok(), Some(0));
        source.insert(row(8, 0, "new")).await;
        assert_eq!(poller.poll_once().await.ok(), Some(1));
        assert_eq!(drain(&mut rx), ["new"]);
    }

    #[tokio::test]
    async fn identical_transfers_in_one_transaction_are_both_delivered() {
        let source = Arc::new(MemorySource::new());
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 100);
        let _ = poller.poll_once().await;

        source.insert(row(5, 0, "0xbatch")).await;
        source.insert(row(5, 1, "0xbatch")).await;
        assert_eq!(poller.poll_once().await.ok(), Some(2));
        assert_eq!(drain(&mut rx), ["0xbatch", "0xbatch"]);
    }

    #[tokio::test]
    async fn empty_table_delivers_first_rows() {
        let source = Arc::new(MemorySource::new());
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 100);
        let _ = poller.poll_once().await;

        source.insert(row(5, 0, "0x05")).await;
        assert_eq!(poller.poll_once().await.ok(), Some(1));
        assert_eq!(drain(&mut rx), ["0x05"]);
    }

    #[tokio::test]
    async fn start_timestamp_replays_stored_rows() {
        let source = Arc::new(MemorySource::new());
        source.insert(row(10, 0, "0x01")).await;
        source.insert(row(15, 0, "0x015")).await;
        source.insert(row(20, 0, "0x02")).await;
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let mut poller = poller(&source, &feed, 100).starting_at(Some(15));

        assert_eq!(poller.poll_once().await.ok(), Some(2));
        assert_eq!(drain(&mut rx), ["0x015", "0x02"]);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let source = Arc::new(MemorySource::new());
        let feed = TransferFeed::new(100);
        let mut rx = feed.subscribe();
        let (tx, shutdown) = watch::channel(false);
        let mut poller = poller(&source, &feed, 100);
        assert!(poller.prime().await.is_ok());
        let handle = tokio::spawn(poller.run(shutdown));

        source.insert(row(7, 0, "0x07")).await;

        let Ok(Ok(event)) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await else {
            panic!("poller did not publish");
        };
        assert_eq!(event.transaction_hash, "0x07");

        let _ = tx.send(true);
        assert!(
            tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .is_ok()
        );
    }
}
