//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use davsnap_core::ConfigOverrides;
use std::path::PathBuf;

pub use crate::commands::daemon::DaemonArgs;
pub use crate::commands::restore::RestoreArgs;
pub use crate::commands::upload::UploadArgs;

/// davsnap - periodic snapshots of a data directory to a WebDAV server
#[derive(Parser, Debug)]
#[command(name = "davsnap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a davsnap.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive the data directory, upload it and prune old snapshots
    Upload(UploadArgs),

    /// Replace the data directory with the newest snapshot
    Restore(RestoreArgs),

    /// Upload on a fixed interval until interrupted
    Daemon(DaemonArgs),
}

/// Data directory, WebDAV and retention settings shared by every mode
///
/// Each value falls back to the config file, then to the built-in default.
#[derive(Args, Debug, Clone, Default)]
pub struct SnapshotArgs {
    /// Local directory to back up and restore
    #[arg(long, env = "DAVSNAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// WebDAV endpoint URL
    #[arg(long, env = "DAVSNAP_WEBDAV_URL")]
    pub webdav_url: Option<String>,

    /// WebDAV username
    #[arg(long, env = "DAVSNAP_WEBDAV_USERNAME")]
    pub webdav_username: Option<String>,

    /// WebDAV password
    #[arg(long, env = "DAVSNAP_WEBDAV_PASSWORD", hide_env_values = true)]
    pub webdav_password: Option<String>,

    /// Directory below the endpoint that holds the snapshots [default: ""]
    #[arg(long, env = "DAVSNAP_WEBDAV_BACKUP_PATH")]
    pub webdav_backup_path: Option<String>,

    /// Number of snapshots to keep, at least 1 [default: 5]
    #[arg(long, env = "DAVSNAP_KEEP")]
    pub keep: Option<usize>,
}

impl SnapshotArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            url: self.webdav_url.clone(),
            backup_path: self.webdav_backup_path.clone(),
            username: self.webdav_username.clone(),
            password: self.webdav_password.clone(),
            keep: self.keep,
            interval_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_unknown_mode_is_usage_error() {
        let err = Cli::try_parse_from(["davsnap", "sync"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "davsnap",
            "upload",
            "--data-dir",
            "/srv/data",
            "--webdav-url",
            "https://dav.example.com",
            "--webdav-backup-path",
            "snaps/app",
            "--keep",
            "3",
            "--fail-on-error",
        ])
        .unwrap();

        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert!(args.fail_on_error);

        let overrides = args.snapshot.overrides();
        assert_eq!(overrides.data_dir, Some(PathBuf::from("/srv/data")));
        assert_eq!(overrides.url.as_deref(), Some("https://dav.example.com"));
        assert_eq!(overrides.backup_path.as_deref(), Some("snaps/app"));
        assert_eq!(overrides.keep, Some(3));
        assert!(overrides.interval_secs.is_none());
    }

    #[test]
    fn test_keep_help_states_minimum() {
        let mut cmd = Cli::command();
        let help = cmd
            .find_subcommand_mut("upload")
            .unwrap()
            .render_help()
            .to_string();
        assert!(help.contains("at least 1"), "{}", help);
    }

    #[test]
    fn test_daemon_interval_flag() {
        let cli = Cli::try_parse_from(["davsnap", "-vv", "daemon", "--interval", "120"]).unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Daemon(args) = cli.command else {
            panic!("expected daemon");
        };
        assert_eq!(args.interval, Some(120));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["davsnap", "restore", "--config", "/etc/davsnap.yaml"]).unwrap();
        assert_eq!(cli.config, Some(Utf8PathBuf::from("/etc/davsnap.yaml")));
    }
}
