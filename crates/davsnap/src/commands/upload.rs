//! Upload command

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use davsnap_backup::{CycleOutcome, NoOpObserver};
use std::sync::Arc;

use super::{build_manager, exit_on_failure, print_settings, resolve_config};
use crate::cli::SnapshotArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Exit with status 1 when the cycle fails
    #[arg(long)]
    pub fail_on_error: bool,
}

pub async fn run(args: UploadArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = resolve_config(config_path, args.snapshot.overrides())?;
    print_settings("Upload Snapshot", &config);

    let manager = build_manager(&config, Arc::new(NoOpObserver))?;
    let outcome = manager.upload_and_prune(&config.data_dir, config.keep).await;

    output::outcome(&outcome);
    if let CycleOutcome::Done(report) = &outcome {
        output::kv("SHA256", &report.archive.sha256);
        if let Some(prune) = &report.prune {
            if !prune.failed.is_empty() {
                output::warning(&format!(
                    "Could not delete stale snapshots: {}",
                    prune.failed.join(", ")
                ));
            }
        }
    }

    exit_on_failure(&outcome, args.fail_on_error);
    Ok(())
}
