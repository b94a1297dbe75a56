//! davsnap snapshot lifecycle
//!
//! This crate archives a local data directory, uploads the archive to a WebDAV
//! collection, keeps only the newest N snapshots and restores the newest one
//! on demand.
//!
//! # Components
//!
//! - **Archive codec** ([`archive`]): directory tree to `.tar.gz` and back
//! - **Naming** ([`naming`]): `backup_YYYYMMDD_HHMMSS.tar.gz` identifiers whose
//!   lexicographic order is their chronological order
//! - **Store** ([`store`]): the [`SnapshotStore`] capability set and its WebDAV
//!   implementation
//! - **Lifecycle** ([`lifecycle`]): upload-and-prune and restore-latest cycles
//!   that never return an error, only a [`CycleOutcome`]
//!
//! # Examples
//!
//! ```no_run
//! use davsnap_backup::{SnapshotManager, TracingObserver, WebDavStore};
//! use davsnap_core::StoreConfig;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StoreConfig::new("https://dav.example.com/files/me", "me", "secret")
//!         .with_backup_path("backups/app");
//!     let store = WebDavStore::new(config)?;
//!     let manager = SnapshotManager::new(store).with_observer(Arc::new(TracingObserver));
//!
//!     let outcome = manager.upload_and_prune(Path::new("/var/lib/app"), 5).await;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! # Constraints
//!
//! A store location must have a single writer. Two processes pointed at the
//! same collection are not coordinated: a prune that listed before another
//! process finished uploading can delete that fresh snapshot.

pub mod archive;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod outcome;
pub mod store;

// Re-export commonly used types
pub use archive::{ArchiveCodec, ArchiveHandle, DEFAULT_COMPRESSION_LEVEL};
pub use error::{ArchiveError, Error, Result, StoreError};
pub use lifecycle::SnapshotManager;
pub use naming::{is_snapshot_name, new_name, SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX};
pub use outcome::{
    ArchiveSummary, CycleObserver, CycleOutcome, Failure, FailureKind, NoOpObserver,
    PruneReport, RestoreReport, SkipReason, TracingObserver, UploadReport,
};
pub use store::{SnapshotStore, WebDavStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_naming_constants() {
        assert_eq!(SNAPSHOT_PREFIX, "backup_");
        assert_eq!(SNAPSHOT_SUFFIX, ".tar.gz");
    }

    #[test]
    fn test_compression_level() {
        assert_eq!(DEFAULT_COMPRESSION_LEVEL, 6);
    }
}
