//! Mutation watcher and rescan debouncer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::MutationBatch;
use crate::dom::{MutationRecord, SharedDocument, WeakDocument};
use crate::metrics::{MUTATIONS_SUPPRESSED, RESCANS_REQUESTED};

/// Sending half of a debounced trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    /// Request a rescan. Resets the pending window.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// Receiving half of a debounced trigger.
#[derive(Debug)]
pub struct DebouncedTriggers {
    rx: mpsc::UnboundedReceiver<()>,
    window: Duration,
}

/// Create a debouncer with the given quiet window.
#[must_use]
pub fn debouncer(window: Duration) -> (Debouncer, DebouncedTriggers) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Debouncer { tx }, DebouncedTriggers { rx, window })
}

impl DebouncedTriggers {
    /// Wait for a trigger followed by a full quiet window.
    ///
    /// Triggers that arrived while the caller was busy are coalesced into
    /// this one. Returns `false` on cancellation or once every sender is gone
    /// and nothing is pending.
    pub async fn fired(&mut self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            () = cancel.cancelled() => return false,
            msg = self.rx.recv() => {
                if msg.is_none() {
                    return false;
                }
            }
        }

        let sleep = tokio::time::sleep(self.window);
        tokio::pin!(sleep);
        let mut closed = false;
        loop {
            tokio::select! {
                () = cancel.cancelled() => return false,
                () = &mut sleep => return true,
                msg = self.rx.recv(), if !closed => match msg {
                    Some(()) => sleep
                        .as_mut()
                        .reset(tokio::time::Instant::now() + self.window),
                    None => closed = true,
                },
            }
        }
    }
}

/// Watcher statistics.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub batches: AtomicU64,
    pub suppressed: AtomicU64,
    pub rescans: AtomicU64,
}

impl WatcherStats {
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            rescans: self.rescans.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStatsSnapshot {
    pub batches: u64,
    pub suppressed: u64,
    pub rescans: u64,
}

/// Turns foreign child-list mutations into debounced rescan requests.
pub struct MutationWatcher {
    doc: WeakDocument,
    records: mpsc::UnboundedReceiver<MutationRecord>,
    debouncer: Debouncer,
    stats: Arc<WatcherStats>,
}

impl MutationWatcher {
    #[must_use]
    pub fn new(
        doc: &SharedDocument,
        records: mpsc::UnboundedReceiver<MutationRecord>,
        debouncer: Debouncer,
        stats: Arc<WatcherStats>,
    ) -> Self {
        Self {
            doc: doc.downgrade(),
            records,
            debouncer,
            stats,
        }
    }

    /// Process record batches until cancelled or the document goes away.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut batch = MutationBatch::new();
        loop {
            let first = tokio::select! {
                () = cancel.cancelled() => break,
                record = self.records.recv() => match record {
                    Some(record) => record,
                    None => break,
                },
            };

            batch.clear();
            batch.add(first);
            while let Ok(record) = self.records.try_recv() {
                batch.add(record);
            }
            if batch.is_empty() {
                continue;
            }

            self.handle_batch(&batch);
        }
        tracing::debug!("Mutation watcher stopped");
    }

    fn handle_batch(&self, batch: &MutationBatch) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        self.stats.batches.fetch_add(1, Ordering::Relaxed);
        if doc.read(|doc| batch.should_rescan(doc)) {
            self.stats.rescans.fetch_add(1, Ordering::Relaxed);
            RESCANS_REQUESTED.inc();
            tracing::debug!(records = batch.len(), "Foreign content added, rescan requested");
            self.debouncer.trigger();
        } else {
            self.stats.suppressed.fetch_add(1, Ordering::Relaxed);
            MUTATIONS_SUPPRESSED.inc();
            tracing::trace!(records = batch.len(), "Ignored self-caused mutations");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ObserverOptions};

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_bursts() {
        let cancel = CancellationToken::new();
        let (tx, mut triggers) = debouncer(Duration::from_millis(300));

        let start = tokio::time::Instant::now();
        tx.trigger();
        let sender = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            sender.trigger();
        });

        assert!(triggers.fired(&cancel).await);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_trigger_fires_after_senders_drop() {
        let cancel = CancellationToken::new();
        let (tx, mut triggers) = debouncer(Duration::from_millis(300));
        tx.trigger();
        drop(tx);
        assert!(triggers.fired(&cancel).await);
        assert!(!triggers.fired(&cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_waiting() {
        let cancel = CancellationToken::new();
        let (tx, mut triggers) = debouncer(Duration::from_millis(300));
        tx.trigger();
        cancel.cancel();
        assert!(!triggers.fired(&cancel).await);
    }

    #[tokio::test]
    async fn test_watcher_filters_self_caused_batches() {
        let mut doc = Document::with_body();
        let records = doc.observe(ObserverOptions::child_list());
        let shared = SharedDocument::new(doc);
        let stats = Arc::new(WatcherStats::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let watcher = MutationWatcher::new(
            &shared,
            records,
            Debouncer { tx },
            Arc::clone(&stats),
        );
        let task = tokio::spawn(watcher.run(cancel.clone()));

        shared.with_doc(|d| {
            let body = d.body().unwrap();
            let span = d.create_element("span");
            d.set_attribute(span, "class", crate::engine::filter::WRAPPER_CLASS)
                .unwrap();
            d.append_child(body, span).unwrap();
        });
        while stats.snapshot().batches < 1 {
            tokio::task::yield_now().await;
        }

        shared.with_doc(|d| {
            let body = d.body().unwrap();
            let p = d.create_element("p");
            d.append_child(body, p).unwrap();
        });

        assert_eq!(rx.recv().await, Some(()));
        cancel.cancel();
        task.await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.suppressed, 1);
        assert_eq!(snapshot.rescans, 1);
    }
}
