//! Snapshot lifecycle manager
//!
//! Each operation is a complete, independent run. Nothing is cached between
//! runs: every cycle derives the existing snapshots and their order from a fresh
//! listing of the store.
//!
//! Cycles never return an error. Failures are caught at the cycle boundary and
//! reported as [`CycleOutcome::Failed`], and local temporary files are removed
//! on every exit path.

use crate::archive::ArchiveCodec;
use crate::error::{ArchiveError, Error, Result};
use crate::naming;
use crate::outcome::{
    CycleObserver, CycleOutcome, NoOpObserver, PruneReport, RestoreReport, SkipReason,
    UploadReport,
};
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Prefix of the directory a restore is staged in, inside the data directory
const STAGING_PREFIX: &str = ".davsnap-restore-";

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Creates, prunes and restores snapshots against one store
pub struct SnapshotManager<S> {
    store: S,
    codec: ArchiveCodec,
    observer: Arc<dyn CycleObserver>,
    clock: Clock,
}

impl<S: SnapshotStore> SnapshotManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            codec: ArchiveCodec::new(),
            observer: Arc::new(NoOpObserver),
            clock: Box::new(Utc::now),
        }
    }

    /// Sets the archive codec (compression level, temp directory).
    pub fn with_codec(mut self, codec: ArchiveCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the observer that receives every cycle outcome.
    pub fn with_observer(mut self, observer: Arc<dyn CycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the wall clock used to name snapshots.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Archives `data_dir`, uploads it as a new snapshot, then prunes the store
    /// down to the newest `keep` snapshots.
    ///
    /// A missing data directory is skipped without touching the store. A failed
    /// upload is reported as failed but pruning still runs.
    pub async fn upload_and_prune(
        &self,
        data_dir: &Path,
        keep: usize,
    ) -> CycleOutcome<UploadReport> {
        let start = Instant::now();
        let outcome = CycleOutcome::from_result(self.try_upload(data_dir, keep).await);
        debug!("Upload cycle finished in {:?}", start.elapsed());

        self.observer.on_upload(&outcome);
        outcome
    }

    async fn try_upload(&self, data_dir: &Path, keep: usize) -> Result<CycleOutcome<UploadReport>> {
        if !data_dir.is_dir() {
            info!(
                "Data directory {} does not exist, nothing to back up",
                data_dir.display()
            );
            return Ok(CycleOutcome::Skipped(SkipReason::DataDirMissing));
        }

        info!("Stage 1/4: Ensuring container {}", self.store.location());
        self.store.ensure_container().await;

        let name = naming::new_name((self.clock)());

        info!("Stage 2/4: Archiving {}", data_dir.display());
        let archive = self.codec.create(data_dir)?;

        info!(
            "Stage 3/4: Uploading {} ({} bytes)",
            name,
            archive.size_bytes()
        );
        let uploaded = self.store.put(&name, archive.path()).await;
        let summary = archive.summary().clone();
        drop(archive);

        info!("Stage 4/4: Pruning to the newest {} snapshots", keep);
        let prune = match self.prune(keep).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Prune skipped: {}", e);
                None
            }
        };

        uploaded?;

        Ok(CycleOutcome::Done(UploadReport {
            snapshot: name,
            archive: summary,
            prune,
        }))
    }

    /// Snapshot names on the store, oldest first.
    pub async fn list_snapshots(&self) -> Result<Vec<String>> {
        let names = self.store.list().await?;
        Ok(naming::sort_snapshots(names))
    }

    /// Deletes all but the newest `keep` snapshots, oldest first.
    ///
    /// Each deletion is independent: a failed delete is logged and recorded
    /// in the report, and the remaining deletions still run. Only a failed
    /// listing is an error.
    pub async fn prune(&self, keep: usize) -> Result<PruneReport> {
        let snapshots = self.list_snapshots().await?;
        let mut report = PruneReport {
            listed: snapshots.len(),
            ..Default::default()
        };

        for name in naming::stale(&snapshots, keep) {
            match self.store.delete(name).await {
                Ok(()) => {
                    debug!("Deleted stale snapshot {}", name);
                    report.deleted.push(name.clone());
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failed.push(name.clone());
                }
            }
        }

        Ok(report)
    }

    /// Replaces the contents of `data_dir` with the newest snapshot.
    ///
    /// An empty store is skipped and leaves `data_dir` untouched. The snapshot
    /// is extracted into a staging directory first, so a failed download or a
    /// corrupt archive leaves the existing contents in place.
    pub async fn restore_latest(&self, data_dir: &Path) -> CycleOutcome<RestoreReport> {
        let start = Instant::now();
        let outcome = CycleOutcome::from_result(self.try_restore(data_dir).await);
        debug!("Restore cycle finished in {:?}", start.elapsed());

        self.observer.on_restore(&outcome);
        outcome
    }

    async fn try_restore(&self, data_dir: &Path) -> Result<CycleOutcome<RestoreReport>> {
        let snapshots = self.list_snapshots().await?;
        let Some(latest) = naming::latest(&snapshots) else {
            info!("No snapshots on {}, nothing to restore", self.store.location());
            return Ok(CycleOutcome::Skipped(SkipReason::NoSnapshots));
        };

        info!("Stage 1/2: Downloading {}", latest);
        let download = self
            .codec
            .temp_file()
            .map_err(|e| Error::local_io("Failed to create download file", e))?;
        let bytes_downloaded = self.store.get(latest, download.path()).await?;

        info!("Stage 2/2: Replacing contents of {}", data_dir.display());
        let entry_count = replace_dir_contents(&self.codec, download.path(), data_dir)?;

        Ok(CycleOutcome::Done(RestoreReport {
            snapshot: latest.to_string(),
            bytes_downloaded,
            entry_count,
        }))
    }
}

/// Extracts `archive` into a staging directory inside `data_dir`, then swaps
/// the staged entries in for everything else in `data_dir`.
///
/// `data_dir` itself is kept (it may be a mount point) and created if missing.
fn replace_dir_contents(codec: &ArchiveCodec, archive: &Path, data_dir: &Path) -> Result<usize> {
    let write_err = |e: io::Error| ArchiveError::extract(data_dir, e);

    fs::create_dir_all(data_dir).map_err(write_err)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(data_dir)
        .map_err(write_err)?;

    let entry_count = codec.extract(archive, staging.path())?;

    for entry in fs::read_dir(data_dir).map_err(write_err)? {
        let entry = entry.map_err(write_err)?;
        let path = entry.path();
        if path.as_path() == staging.path() {
            continue;
        }
        let is_dir = entry.file_type().map_err(write_err)?.is_dir();
        remove_entry(&path, is_dir).map_err(write_err)?;
    }

    for entry in fs::read_dir(staging.path()).map_err(write_err)? {
        let entry = entry.map_err(write_err)?;
        move_entry(&entry.path(), &data_dir.join(entry.file_name())).map_err(write_err)?;
    }

    Ok(entry_count)
}

/// Removes a file or a whole tree, including trees with read-only directories.
fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    if !is_dir {
        return fs::remove_file(path);
    }
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_dirs_writable(path)?;
            fs::remove_dir_all(path)
        }
        other => other,
    }
}

#[cfg(unix)]
fn make_dirs_writable(root: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            let mode = entry.metadata().map_err(io::Error::from)?.permissions().mode();
            fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode | 0o700))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_dirs_writable(_root: &Path) -> io::Result<()> {
    Ok(())
}

/// Renames `from` to `to`.
///
/// Moving a directory to a new parent rewrites its `..` entry, which needs
/// write permission on the directory itself, so a read-only directory is
/// made writable for the move and gets its mode back afterwards.
#[cfg(unix)]
fn move_entry(from: &Path, to: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::symlink_metadata(from)?;
    let mode = metadata.permissions().mode();
    if !metadata.is_dir() || mode & 0o200 != 0 {
        return fs::rename(from, to);
    }

    fs::set_permissions(from, fs::Permissions::from_mode(mode | 0o200))?;
    fs::rename(from, to)?;
    fs::set_permissions(to, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn move_entry(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}
