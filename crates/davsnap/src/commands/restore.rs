//! Restore command

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use davsnap_backup::NoOpObserver;
use std::sync::Arc;

use super::{build_manager, exit_on_failure, print_settings, resolve_config};
use crate::cli::SnapshotArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Exit with status 1 when the cycle fails
    #[arg(long)]
    pub fail_on_error: bool,
}

pub async fn run(args: RestoreArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = resolve_config(config_path, args.snapshot.overrides())?;
    print_settings("Restore Snapshot", &config);

    let manager = build_manager(&config, Arc::new(NoOpObserver))?;
    let outcome = manager.restore_latest(&config.data_dir).await;

    output::outcome(&outcome);

    exit_on_failure(&outcome, args.fail_on_error);
    Ok(())
}
