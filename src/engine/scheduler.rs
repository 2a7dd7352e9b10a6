//! Cooperative batch scheduler.
//!
//! Drains a candidate list in fixed-size batches. In performance mode the
//! scheduler yields to the runtime between batches so that other tasks (the
//! mutation watcher, click handlers) get to run. Otherwise batches run
//! back-to-back.
//!
//! ```text
//! Idle -> Running(0) -> Yielding -> Running(1) -> ... -> Done
//! ```

use crate::dom::NodeId;
use crate::observability::spans;
use crate::settings::ThroughputProfile;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { batch: usize },
    Yielding,
    Done,
}

/// Work performed for each batch and once at the end.
pub trait BatchSink {
    /// Process one batch of units.
    fn process_batch(&mut self, batch: &[NodeId]) -> BatchOutcome;

    /// Called once after the last batch. Returns the number of copy
    /// triggers that received a handler.
    fn finish(&mut self) -> usize;
}

/// Counts reported by a [`BatchSink`] for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub units_annotated: usize,
    pub units_without_change: usize,
    pub units_skipped: usize,
    pub wrappers_created: usize,
    pub errors: usize,
}

impl std::ops::AddAssign for BatchOutcome {
    fn add_assign(&mut self, rhs: Self) {
        self.units_annotated += rhs.units_annotated;
        self.units_without_change += rhs.units_without_change;
        self.units_skipped += rhs.units_skipped;
        self.wrappers_created += rhs.wrappers_created;
        self.errors += rhs.errors;
    }
}

/// Summary of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub candidates: usize,
    pub batches: usize,
    pub yields: usize,
    pub outcome: BatchOutcome,
    pub triggers_wired: usize,
}

/// Batch scheduler for one pass.
#[derive(Debug)]
pub struct BatchScheduler {
    profile: ThroughputProfile,
    state: SchedulerState,
    transitions: Vec<SchedulerState>,
}

impl BatchScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new(profile: ThroughputProfile) -> Self {
        Self {
            profile,
            state: SchedulerState::Idle,
            transitions: vec![SchedulerState::Idle],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Every state entered so far, in order.
    #[must_use]
    pub fn transitions(&self) -> &[SchedulerState] {
        &self.transitions
    }

    fn enter(&mut self, state: SchedulerState) {
        self.state = state;
        self.transitions.push(state);
    }

    /// Drain `candidates` into `sink`.
    ///
    /// A run is never cancelled once started. The sink's
    /// [`finish`](BatchSink::finish) runs exactly once after the last batch;
    /// an empty candidate list finishes immediately without it.
    pub async fn run<S: BatchSink>(&mut self, candidates: &[NodeId], sink: &mut S) -> ScheduleReport {
        let mut report = ScheduleReport {
            candidates: candidates.len(),
            ..ScheduleReport::default()
        };

        if candidates.is_empty() {
            self.enter(SchedulerState::Done);
            return report;
        }

        let batch_size = self.profile.batch_size.max(1);
        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if index > 0 && self.profile.yield_between_batches {
                self.enter(SchedulerState::Yielding);
                tokio::task::yield_now().await;
                report.yields += 1;
            }

            self.enter(SchedulerState::Running { batch: index });
            let outcome = {
                let _span = spans::batch_span(index, batch.len()).entered();
                sink.process_batch(batch)
            };
            tracing::trace!(
                batch = index,
                size = batch.len(),
                wrappers = outcome.wrappers_created,
                "Processed batch"
            );
            report.outcome += outcome;
            report.batches += 1;
        }

        self.enter(SchedulerState::Done);
        report.triggers_wired = sink.finish();
        report
    }
}
