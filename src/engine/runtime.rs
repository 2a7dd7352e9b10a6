//! Engine runtime: scan passes and the background tasks around them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::annotator::{annotate_unit, AnnotateOutcome};
use super::copy::{CopyHandler, CopyOutcome};
use super::registry::DedupRegistry;
use super::scanner::collect_candidates;
use super::scheduler::{BatchOutcome, BatchScheduler, BatchSink, ScheduleReport};
use super::watcher::{debouncer, Debouncer, MutationWatcher, WatcherStats, WatcherStatsSnapshot};
use crate::clipboard::Clipboard;
use crate::config::{Config, DEFAULT_DEBOUNCE, DEFAULT_FEEDBACK, DEFAULT_INITIAL_DELAY};
use crate::dom::{NodeId, ObserverOptions, SharedDocument};
use crate::metrics::{CANDIDATES_LAST_PASS, SCAN_PASSES, UNIT_ERRORS, WRAPPERS_CREATED};
use crate::observability::spans;
use crate::settings::Settings;
use crate::{Error, Result};

/// Runtime subset of [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub debounce: Duration,
    pub initial_delay: Duration,
    pub feedback_duration: Duration,
    pub debug_clipboard: bool,
    /// Reclaim detached nodes after every pass of the background loop.
    pub reclaim_detached: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            initial_delay: DEFAULT_INITIAL_DELAY,
            feedback_duration: DEFAULT_FEEDBACK,
            debug_clipboard: false,
            reclaim_detached: false,
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            debounce: config.debounce,
            initial_delay: config.initial_delay,
            feedback_duration: config.feedback_duration,
            debug_clipboard: config.debug_clipboard,
            reclaim_detached: config.reclaim_detached,
        }
    }
}

struct EngineInner {
    doc: SharedDocument,
    settings: watch::Receiver<Settings>,
    registry: Mutex<DedupRegistry>,
    copy: CopyHandler,
    pass_lock: tokio::sync::Mutex<()>,
    passes: AtomicU64,
    watcher_stats: Arc<WatcherStats>,
}

impl EngineInner {
    async fn scan_pass(&self) -> ScheduleReport {
        let _pass = self.pass_lock.lock().await;
        let settings = *self.settings.borrow();
        let profile = settings.throughput();
        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;

        let span = spans::scan_span(pass, settings.performance_mode);
        async {
            let candidates = self.doc.read(|doc| {
                let mut registry = self.registry.lock();
                registry.prune(doc);
                collect_candidates(doc, &registry, &profile).0
            });

            let mut sink = AnnotationSink {
                doc: &self.doc,
                registry: &self.registry,
                copy: &self.copy,
            };
            let mut scheduler = BatchScheduler::new(profile);
            let report = scheduler.run(&candidates, &mut sink).await;

            SCAN_PASSES.inc();
            CANDIDATES_LAST_PASS.set(i64::try_from(report.candidates).unwrap_or(i64::MAX));
            WRAPPERS_CREATED.inc_by(report.outcome.wrappers_created as u64);
            tracing::info!(
                candidates = report.candidates,
                batches = report.batches,
                yields = report.yields,
                wrappers = report.outcome.wrappers_created,
                errors = report.outcome.errors,
                triggers = report.triggers_wired,
                "Scan pass complete"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn reclaim(&self) -> usize {
        let _pass = self.pass_lock.lock().await;
        self.doc.with_doc(|doc| {
            let freed = doc.collect_garbage();
            let pruned = self.registry.lock().prune(doc);
            if freed > 0 {
                tracing::debug!(freed, pruned, "Reclaimed detached nodes");
            }
            freed
        })
    }
}

/// Annotates each batch under one document lock.
struct AnnotationSink<'a> {
    doc: &'a SharedDocument,
    registry: &'a Mutex<DedupRegistry>,
    copy: &'a CopyHandler,
}

impl BatchSink for AnnotationSink<'_> {
    fn process_batch(&mut self, batch: &[NodeId]) -> BatchOutcome {
        self.doc.with_doc(|doc| {
            let mut registry = self.registry.lock();
            let mut outcome = BatchOutcome::default();
            for &unit in batch {
                match annotate_unit(doc, &mut registry, unit) {
                    Ok(AnnotateOutcome::Annotated { wrappers }) => {
                        outcome.units_annotated += 1;
                        outcome.wrappers_created += wrappers.len();
                    }
                    Ok(AnnotateOutcome::NoMatches | AnnotateOutcome::Unchanged) => {
                        outcome.units_without_change += 1;
                    }
                    Ok(AnnotateOutcome::Skipped(reason)) => {
                        tracing::trace!(unit = %unit, ?reason, "Skipped text unit");
                        outcome.units_skipped += 1;
                    }
                    Err(e) => {
                        tracing::debug!(unit = %unit, error = %e, "Failed to annotate text unit");
                        UNIT_ERRORS.inc();
                        outcome.errors += 1;
                    }
                }
            }
            outcome
        })
    }

    fn finish(&mut self) -> usize {
        let weak = self.doc.downgrade();
        self.doc.with_doc(|doc| self.copy.wire_triggers(doc, &weak))
    }
}

/// The postal code engine bound to one document.
pub struct Engine {
    inner: Arc<EngineInner>,
    config: EngineConfig,
    cancel: CancellationToken,
    debouncer: Mutex<Option<Debouncer>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("passes", &self.passes())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Bind an engine to `doc`.
    #[must_use]
    pub fn new(
        doc: SharedDocument,
        settings: watch::Receiver<Settings>,
        clipboard: Arc<dyn Clipboard>,
        config: EngineConfig,
    ) -> Self {
        let copy = CopyHandler::new(clipboard, config.feedback_duration, config.debug_clipboard);
        Self {
            inner: Arc::new(EngineInner {
                doc,
                settings,
                registry: Mutex::new(DedupRegistry::new()),
                copy,
                pass_lock: tokio::sync::Mutex::new(()),
                passes: AtomicU64::new(0),
                watcher_stats: Arc::new(WatcherStats::default()),
            }),
            config,
            cancel: CancellationToken::new(),
            debouncer: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Run one scan pass now.
    ///
    /// Waits for a pass already in progress to finish first.
    pub async fn scan_now(&self) -> ScheduleReport {
        self.inner.scan_pass().await
    }

    /// Start the mutation watcher and the debounced scan loop.
    ///
    /// The first pass runs after the configured initial delay.
    ///
    /// Replaced text units and swapped-out trigger labels stay in the arena
    /// until reclaimed. With [`EngineConfig::reclaim_detached`] set, the loop
    /// reclaims them after each pass; otherwise the host calls
    /// [`Engine::reclaim`] on its own schedule. Either way every detached
    /// node is freed, including ones the host is still holding.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is already running or was shut down.
    pub fn start(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::internal("engine has been shut down"));
        }
        let mut slot = self.debouncer.lock();
        if slot.is_some() {
            return Err(Error::internal("engine already started"));
        }

        let records = self
            .inner
            .doc
            .with_doc(|doc| doc.observe(ObserverOptions::child_list()));
        let (trigger, mut triggers) = debouncer(self.config.debounce);

        let watcher = MutationWatcher::new(
            &self.inner.doc,
            records,
            trigger.clone(),
            Arc::clone(&self.inner.watcher_stats),
        );
        let watcher_task = tokio::spawn(watcher.run(self.cancel.child_token()));

        let inner = Arc::clone(&self.inner);
        let cancel = self.cancel.clone();
        let initial_delay = self.config.initial_delay;
        let reclaim = self.config.reclaim_detached;
        let scan_task = tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(initial_delay) => {}
            }
            loop {
                inner.scan_pass().await;
                if reclaim {
                    inner.reclaim().await;
                }
                if !triggers.fired(&cancel).await {
                    break;
                }
            }
            tracing::debug!("Scan loop stopped");
        });

        self.tasks.lock().extend([watcher_task, scan_task]);
        *slot = Some(trigger);
        tracing::info!(
            debounce_ms = self.config.debounce.as_millis(),
            initial_delay_ms = initial_delay.as_millis(),
            "Engine started"
        );
        Ok(())
    }

    /// Copy the code behind `trigger`, as a click on it would.
    ///
    /// Returns once any success feedback has been reverted.
    pub async fn copy(&self, trigger: NodeId) -> CopyOutcome {
        self.inner.copy.copy(&self.inner.doc, trigger).await
    }

    /// Free every detached node and forget registry entries for them.
    ///
    /// Waits for a pass in progress. Handles to freed nodes go inert.
    /// Returns the number of reclaimed nodes.
    pub async fn reclaim(&self) -> usize {
        self.inner.reclaim().await
    }

    /// Ask the running engine for a debounced rescan.
    ///
    /// Returns `false` if the engine is not running.
    pub fn request_scan(&self) -> bool {
        match self.debouncer.lock().as_ref() {
            Some(trigger) if !self.cancel.is_cancelled() => {
                trigger.trigger();
                true
            }
            _ => false,
        }
    }

    /// Whether background tasks have been started and not shut down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.debouncer.lock().is_some() && !self.cancel.is_cancelled()
    }

    /// Stop background tasks and wait for them.
    ///
    /// A pass already in progress runs to completion first.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Engine task ended abnormally");
            }
        }
        tracing::info!(passes = self.passes(), "Engine stopped");
    }

    /// Completed or started scan passes.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.inner.passes.load(Ordering::Relaxed)
    }

    /// Mutation watcher counters.
    #[must_use]
    pub fn watcher_stats(&self) -> WatcherStatsSnapshot {
        self.inner.watcher_stats.snapshot()
    }

    /// Number of processed units and recorded annotation keys.
    #[must_use]
    pub fn registry_len(&self) -> (usize, usize) {
        let registry = self.inner.registry.lock();
        (registry.processed_len(), registry.annotated_len())
    }

    /// The document this engine annotates.
    #[must_use]
    pub fn document(&self) -> &SharedDocument {
        &self.inner.doc
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
