//! # davsnap-core
//!
//! Core library for the davsnap CLI providing:
//! - Configuration types for the data directory, the WebDAV store and retention
//! - Configuration file parsing (davsnap.yaml)
//! - Configuration error types

pub mod config;
pub mod error;

pub use config::{
    ConfigFile, ConfigOverrides, SnapshotConfig, StoreConfig, DEFAULT_INTERVAL_SECS, DEFAULT_KEEP,
    MIN_INTERVAL_SECS,
};
pub use error::{Error, Result};
