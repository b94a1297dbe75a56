//! Snapshot naming and ordering
//!
//! A snapshot is named `backup_<YYYYMMDD_HHMMSS>.tar.gz` with the timestamp in
//! UTC. The timestamp is fixed-width and zero-padded, so sorting names as plain
//! strings sorts them by creation time. "Latest" and "oldest first" are
//! therefore a string sort, never a timestamp parse.
//!
//! The prefix, timestamp format and suffix are the compatibility contract with
//! snapshots written by other implementations; changing any of them orphans
//! existing snapshots.

use chrono::{DateTime, Utc};

/// Fixed prefix of every snapshot name
pub const SNAPSHOT_PREFIX: &str = "backup_";

/// Archive extension of every snapshot name
pub const SNAPSHOT_SUFFIX: &str = ".tar.gz";

/// strftime layout of the embedded timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Builds the snapshot name for `now`.
///
/// Two calls within the same second yield the same name.
pub fn new_name(now: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        SNAPSHOT_PREFIX,
        now.format(TIMESTAMP_FORMAT),
        SNAPSHOT_SUFFIX
    )
}

/// True iff `candidate` carries the snapshot prefix and archive extension.
pub fn is_snapshot_name(candidate: &str) -> bool {
    candidate.starts_with(SNAPSHOT_PREFIX) && candidate.ends_with(SNAPSHOT_SUFFIX)
}

/// Keeps snapshot names only, sorted oldest first, without duplicates.
pub fn sort_snapshots<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut names: Vec<String> = names
        .into_iter()
        .filter(|n| is_snapshot_name(n))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Newest snapshot of an ascending list.
pub fn latest(sorted: &[String]) -> Option<&str> {
    sorted.last().map(String::as_str)
}

/// Snapshots beyond the newest `keep`, oldest first.
pub fn stale(sorted: &[String], keep: usize) -> &[String] {
    let excess = sorted.len().saturating_sub(keep);
    &sorted[..excess]
}
