//! Daemon command
//!
//! Sleeps for the interval, runs one upload-and-prune cycle, and repeats.
//! A failed cycle never stops the loop; only Ctrl-C does, and only while the
//! loop is sleeping, so an in-flight cycle is always allowed to finish.

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use davsnap_backup::{SnapshotManager, SnapshotStore, TracingObserver};
use davsnap_core::MIN_INTERVAL_SECS;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{build_manager, resolve_config};
use crate::cli::SnapshotArgs;

#[derive(Args, Debug)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Seconds between uploads, at least 60 [default: 3600]
    #[arg(long, env = "DAVSNAP_INTERVAL")]
    pub interval: Option<u64>,
}

pub async fn run(args: DaemonArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let mut overrides = args.snapshot.overrides();
    overrides.interval_secs = args.interval;
    let config = resolve_config(config_path, overrides)?;

    let interval = config.effective_interval();
    if config.interval_secs < MIN_INTERVAL_SECS {
        warn!(
            "Interval of {}s is below the minimum, using {}s",
            config.interval_secs,
            interval.as_secs()
        );
    }

    let manager = build_manager(&config, Arc::new(TracingObserver))?;
    info!(
        "Backing up {} to {} every {}s, keeping {} snapshots",
        config.data_dir.display(),
        config.store.container_url(),
        interval.as_secs(),
        config.keep
    );

    let cycles = run_loop(&manager, &config.data_dir, config.keep, interval, shutdown_signal()).await;
    info!("Daemon stopped after {} cycles", cycles);
    Ok(())
}

/// Runs upload cycles until `shutdown` completes, returning the cycle count.
///
/// Every cycle is preceded by a full `interval` of sleep. Outcomes reach the
/// manager's observer; nothing here inspects them.
pub async fn run_loop<S, F>(
    manager: &SnapshotManager<S>,
    data_dir: &Path,
    keep: usize,
    interval: Duration,
    shutdown: F,
) -> u64
where
    S: SnapshotStore,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested");
                return cycles;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        manager.upload_and_prune(data_dir, keep).await;
        cycles += 1;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use davsnap_backup::{
        CycleObserver, CycleOutcome, RestoreReport, SkipReason, UploadReport, WebDavStore,
    };
    use davsnap_core::StoreConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// Signals `done` once `stop_after` upload outcomes have been seen
    struct CountingObserver {
        seen: Mutex<Vec<String>>,
        count: AtomicUsize,
        stop_after: usize,
        done: Arc<Notify>,
    }

    impl CycleObserver for CountingObserver {
        fn on_upload(&self, outcome: &CycleOutcome<UploadReport>) {
            self.seen.lock().unwrap().push(outcome.to_string());
            if self.count.fetch_add(1, Ordering::SeqCst) + 1 == self.stop_after {
                self.done.notify_one();
            }
        }

        fn on_restore(&self, _outcome: &CycleOutcome<RestoreReport>) {}
    }

    #[tokio::test]
    async fn test_loop_survives_cycles_and_stops_on_shutdown() {
        let done = Arc::new(Notify::new());
        let observer = Arc::new(CountingObserver {
            seen: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
            stop_after: 3,
            done: done.clone(),
        });

        // Missing data dir: every cycle is skipped before touching the network
        let scratch = TempDir::new().unwrap();
        let store =
            WebDavStore::new(StoreConfig::new("http://127.0.0.1:9", "alice", "secret")).unwrap();
        let manager = SnapshotManager::new(store).with_observer(observer.clone());

        let cycles = run_loop(
            &manager,
            &scratch.path().join("absent"),
            5,
            Duration::from_millis(5),
            done.notified(),
        )
        .await;

        assert_eq!(cycles, 3);
        let expected = CycleOutcome::<UploadReport>::Skipped(SkipReason::DataDirMissing).to_string();
        assert_eq!(*observer.seen.lock().unwrap(), vec![expected; 3]);
    }

    #[tokio::test]
    async fn test_loop_stops_before_first_cycle() {
        let scratch = TempDir::new().unwrap();
        let store =
            WebDavStore::new(StoreConfig::new("http://127.0.0.1:9", "alice", "secret")).unwrap();
        let manager = SnapshotManager::new(store);

        let cycles = run_loop(
            &manager,
            scratch.path(),
            5,
            Duration::from_secs(3600),
            std::future::ready(()),
        )
        .await;

        assert_eq!(cycles, 0);
    }
}
