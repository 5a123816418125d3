//! Directory publishing for liftoff.
//!
//! [`DirectoryPublisher`] walks a directory tree under a global in-flight
//! limit, publishes every visible file through the [`Pipeline`] (chunk,
//! deduplicate, register through the ledger queue, upload to providers),
//! and publishes each directory's manifest as a directory node. Failures
//! of individual entries are collected in the [`DirectoryReport`] instead
//! of aborting the walk; a directory whose own node fails still reports
//! what was published below it.

pub mod audit;
pub mod config;
pub mod directory;
pub mod error;
pub mod pipeline;

pub use audit::{audit_file_name, write_audit};
pub use config::PublishConfig;
pub use directory::{DirectoryPublisher, DirectoryReport, EntryFailure, SubtreeTally};
pub use error::{PipelineResult, PublishError};
pub use pipeline::Pipeline;
