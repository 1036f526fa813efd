//! Core orchestration for the Osprey validation worker
//!
//! Leaves first:
//!
//! - [`manifest`]: aggregate digest verification against manifest files
//! - [`sequence`]: gap detection in multi-part file sequences
//! - [`scheduler`]: bounded worker pool with a join barrier
//! - [`pipeline`]: the ordered per-file checks
//! - [`orchestrator`]: per-folder reconciliation and finalization
//! - [`runner`]: passes over the storage root, sharding, service loop

pub mod error;
pub mod hooks;
pub mod manifest;
pub mod orchestrator;
pub mod pipeline;
pub mod runner;
pub mod scheduler;
pub mod sequence;

pub use error::{Error, Result};
pub use manifest::{ManifestEntry, ManifestTable, ManifestValidator, ManifestVerdict, parse_manifest};
pub use orchestrator::{FolderOrchestrator, FolderOutcome, FolderScan, SkipReason, classify_tree, reconcile_deletions};
pub use pipeline::{CheckOutcome, FileOutcome, FilePipeline, FileReport, FolderContext};
pub use runner::{RunMode, RunSummary, Runner, Shard, partition_shard};
pub use scheduler::WorkerPool;
pub use sequence::{FileRegistry, SequenceVerdict, check_sequence};
