//! Install and update pipeline for the Keystone runtime bundle
//!
//! Provides:
//! - Probing whether a bundle is installed at the expected version
//! - Cleaning stale artifacts before a fresh install
//! - Streaming download with progress, gzip decompression and tar extraction
//! - Merging the previous user configuration into the shipped defaults
//! - Promoting the extracted bundle and validating the result
//! - An orchestrator tying the stages together and emitting lifecycle events

pub mod cleaner;
pub mod error;
pub mod events;
pub mod fetch;
pub mod finalize;
mod fsutil;
pub mod merge;
pub mod orchestrator;
pub mod probe;

pub use error::{CleanError, FetchError, FinalizeError, InstallError, MergeError};
pub use events::{EventEnvelope, EventSink, FailureStage, UpdateEvent, UpdateStage};
pub use fetch::{ArchiveDownload, ArchiveFetcher, ExtractSummary, ProgressTracker};
pub use merge::ConfigDocument;
pub use orchestrator::{InstallOutcome, InstallPlan, Updater};

/// Bundle version this installer ships with
pub const BUNDLE_VERSION: &str = "1.0.3";
