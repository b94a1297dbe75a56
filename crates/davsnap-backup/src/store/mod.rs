//! Remote store abstraction
//!
//! The lifecycle manager needs only five primitive operations from a store.
//! Archives move between disk and store as files so neither direction buffers a
//! whole snapshot in memory.

use crate::error::StoreError;
use async_trait::async_trait;
use std::path::Path;

pub mod webdav;

pub use webdav::WebDavStore;

/// Capability set of a snapshot container
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Human-readable location, used in log lines
    fn location(&self) -> String;

    /// Create the container if it is missing.
    ///
    /// Best-effort: failures are logged, never returned. A container that is
    /// really missing surfaces later as [`StoreError::Write`].
    async fn ensure_container(&self);

    /// Upload the file at `source` as `name`, returning the bytes sent
    async fn put(&self, name: &str, source: &Path) -> Result<u64, StoreError>;

    /// Download `name` into the file at `dest`, returning the bytes received
    async fn get(&self, name: &str, dest: &Path) -> Result<u64, StoreError>;

    /// Names of the snapshots in the container.
    ///
    /// Only names accepted by [`crate::naming::is_snapshot_name`] are
    /// returned. An empty or missing container is an empty list, not an error.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Delete `name`; deleting an absent object succeeds
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}
