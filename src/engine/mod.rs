//! Postal code engine.
//!
//! This module provides:
//! - Matching and context filtering of text units
//! - In-place annotation with deduplication
//! - Cooperative batch scheduling
//! - Mutation watching with debounced rescans
//! - Copy trigger wiring and feedback

pub mod annotator;
pub mod copy;
pub mod events;
pub mod filter;
pub mod matcher;
pub mod registry;
pub mod runtime;
pub mod scanner;
pub mod scheduler;
pub mod watcher;

pub use annotator::{annotate_unit, trigger_of, AnnotateOutcome, SkipReason, CODE_ATTR};
pub use copy::{CopyHandler, CopyOutcome, COPIED_CLASS, LISTENER_ATTR, SUCCESS_GLYPH};
pub use events::{is_self_caused, MutationBatch};
pub use filter::{TRIGGER_CLASS, WRAPPER_CLASS};
pub use matcher::{contains_match, find_matches, Match};
pub use registry::{AnnotationKey, DedupRegistry};
pub use runtime::{Engine, EngineConfig};
pub use scanner::{candidates, collect_candidates, ScanStats, ScanStatsSnapshot};
pub use scheduler::{BatchOutcome, BatchScheduler, BatchSink, ScheduleReport, SchedulerState};
pub use watcher::{debouncer, DebouncedTriggers, Debouncer, MutationWatcher, WatcherStatsSnapshot};
