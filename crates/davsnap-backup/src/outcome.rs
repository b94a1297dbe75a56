//! Cycle outcomes and the observer hook
//!
//! Lifecycle operations never fail the caller. Instead of an `Err` they return
//! a [`CycleOutcome`], and every outcome is handed to a [`CycleObserver`] so a
//! failed cycle is visible in logs or metrics even though the daemon loop keeps
//! running.

use crate::error::Error;
use std::fmt;

/// Classification of a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ArchiveCreation,
    ArchiveCorrupt,
    ArchiveExtract,
    StoreWrite,
    StoreRead,
    StoreNotFound,
    StoreList,
    StoreDelete,
    LocalIo,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ArchiveCreation => "archive-creation",
            FailureKind::ArchiveCorrupt => "archive-corrupt",
            FailureKind::ArchiveExtract => "archive-extract",
            FailureKind::StoreWrite => "store-write",
            FailureKind::StoreRead => "store-read",
            FailureKind::StoreNotFound => "store-not-found",
            FailureKind::StoreList => "store-list",
            FailureKind::StoreDelete => "store-delete",
            FailureKind::LocalIo => "local-io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a failed cycle failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub cause: String,
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Self {
            kind: err.kind(),
            cause: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.cause)
    }
}

/// Why a cycle had nothing to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Data directory absent or not a directory; nothing to back up
    DataDirMissing,
    /// Store holds no snapshots; nothing to restore
    NoSnapshots,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DataDirMissing => f.write_str("data directory does not exist"),
            SkipReason::NoSnapshots => f.write_str("no snapshots on store"),
        }
    }
}

/// Result of one lifecycle cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome<T> {
    Done(T),
    Skipped(SkipReason),
    Failed(Failure),
}

impl<T> CycleOutcome<T> {
    /// Converts a fallible cycle body into an outcome.
    pub fn from_result(result: Result<CycleOutcome<T>, Error>) -> Self {
        result.unwrap_or_else(|err| CycleOutcome::Failed(err.into()))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, CycleOutcome::Done(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CycleOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }

    pub fn report(&self) -> Option<&T> {
        match self {
            CycleOutcome::Done(report) => Some(report),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CycleOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for CycleOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Done(report) => write!(f, "done: {}", report),
            CycleOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            CycleOutcome::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}

/// Size and identity of an archive that was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Compressed size in bytes
    pub size_bytes: u64,

    /// Directories, files and symlinks written
    pub entry_count: usize,

    /// SHA256 of the compressed bytes, for correlating logs with remote objects
    pub sha256: String,
}

/// What a prune pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Snapshots present before pruning
    pub listed: usize,

    /// Snapshots deleted, oldest first
    pub deleted: Vec<String>,

    /// Snapshots whose deletion failed
    pub failed: Vec<String>,
}

/// Successful upload-and-prune cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub snapshot: String,
    pub archive: ArchiveSummary,

    /// `None` when listing the store for pruning failed
    pub prune: Option<PruneReport>,
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uploaded {} ({} bytes, {} entries)",
            self.snapshot, self.archive.size_bytes, self.archive.entry_count
        )?;
        match &self.prune {
            Some(prune) if prune.failed.is_empty() => {
                write!(f, ", pruned {}", prune.deleted.len())
            }
            Some(prune) => write!(
                f,
                ", pruned {} ({} deletions failed)",
                prune.deleted.len(),
                prune.failed.len()
            ),
            None => write!(f, ", prune skipped"),
        }
    }
}

/// Successful restore-latest cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub snapshot: String,
    pub bytes_downloaded: u64,
    pub entry_count: usize,
}

impl fmt::Display for RestoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "restored {} ({} bytes, {} entries)",
            self.snapshot, self.bytes_downloaded, self.entry_count
        )
    }
}

/// Receives every finished cycle's outcome
///
/// Implement this to export failures as metrics or alerts.
pub trait CycleObserver: Send + Sync {
    /// Called after every upload-and-prune cycle
    fn on_upload(&self, outcome: &CycleOutcome<UploadReport>);

    /// Called after every restore-latest cycle
    fn on_restore(&self, outcome: &CycleOutcome<RestoreReport>);
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl CycleObserver for NoOpObserver {
    fn on_upload(&self, _outcome: &CycleOutcome<UploadReport>) {}

    fn on_restore(&self, _outcome: &CycleOutcome<RestoreReport>) {}
}

/// An observer that logs outcomes using the `tracing` crate
///
/// # Log Levels
///
/// - `Done`: INFO
/// - `Skipped`: INFO
/// - `Failed`: ERROR, with the failure kind as a field
/// - failed prune deletions inside a `Done` upload: WARN
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    fn log<T: fmt::Display>(cycle: &'static str, outcome: &CycleOutcome<T>) {
        match outcome {
            CycleOutcome::Done(report) => tracing::info!(cycle, "{}", report),
            CycleOutcome::Skipped(reason) => tracing::info!(cycle, "Skipped: {}", reason),
            CycleOutcome::Failed(failure) => tracing::error!(
                cycle,
                kind = failure.kind.as_str(),
                "Cycle failed: {}",
                failure.cause
            ),
        }
    }
}

impl CycleObserver for TracingObserver {
    fn on_upload(&self, outcome: &CycleOutcome<UploadReport>) {
        Self::log("upload", outcome);
        if let Some(prune) = outcome.report().and_then(|r| r.prune.as_ref()) {
            if !prune.failed.is_empty() {
                tracing::warn!(
                    cycle = "upload",
                    "Could not delete stale snapshots: {}",
                    prune.failed.join(", ")
                );
            }
        }
    }

    fn on_restore(&self, outcome: &CycleOutcome<RestoreReport>) {
        Self::log("restore", outcome);
    }
}
