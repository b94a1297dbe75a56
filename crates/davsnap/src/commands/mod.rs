//! CLI command implementations

pub mod daemon;
pub mod restore;
pub mod upload;

use anyhow::{Context, Result};
use camino::Utf8Path;
use davsnap_backup::{CycleObserver, CycleOutcome, SnapshotManager, WebDavStore};
use davsnap_core::{ConfigFile, ConfigOverrides, SnapshotConfig};
use std::sync::Arc;

use crate::output;

/// Loads the config file, if one was given, and merges the overrides over it.
pub fn resolve_config(
    config_path: Option<&Utf8Path>,
    overrides: ConfigOverrides,
) -> Result<SnapshotConfig> {
    let file = config_path.map(ConfigFile::load).transpose()?;
    let config = SnapshotConfig::resolve(file, overrides).context("Invalid configuration")?;
    tracing::debug!("Resolved configuration: {:?}", config);
    Ok(config)
}

/// Builds a manager for the configured WebDAV container.
pub fn build_manager(
    config: &SnapshotConfig,
    observer: Arc<dyn CycleObserver>,
) -> Result<SnapshotManager<WebDavStore>> {
    let store = WebDavStore::new(config.store.clone())?;
    Ok(SnapshotManager::new(store).with_observer(observer))
}

/// Prints the configuration a one-shot cycle runs with.
fn print_settings(title: &str, config: &SnapshotConfig) {
    output::header(title);
    output::kv("Data directory", &config.data_dir.display().to_string());
    output::kv("Container", &config.store.container_url());
    output::kv("Keep", &config.keep.to_string());
    println!();
}

/// Exits with status 1 when `--fail-on-error` was given and the cycle failed.
fn exit_on_failure<T>(outcome: &CycleOutcome<T>, fail_on_error: bool) {
    if fail_on_error && outcome.is_failed() {
        std::process::exit(1);
    }
}
