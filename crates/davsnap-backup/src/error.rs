//! Error types for snapshot operations

use crate::outcome::FailureKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using davsnap-backup's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Local archive failures
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Source directory unreadable or changed while it was walked
    #[error("Failed to create archive from {path}: {source}")]
    Creation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed or truncated archive data
    #[error("Archive is corrupt or truncated: {source}")]
    Corrupt {
        #[source]
        source: io::Error,
    },

    /// Filesystem refused a write while materialising entries
    #[error("Failed to extract archive into {path}: {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    pub fn creation(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Creation {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(source: io::Error) -> Self {
        Self::Corrupt { source }
    }

    pub fn extract(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Extract {
            path: path.into(),
            source,
        }
    }
}

/// Remote store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to upload {name}: {message}")]
    Write { name: String, message: String },

    #[error("Failed to download {name}: {message}")]
    Read { name: String, message: String },

    #[error("Snapshot not found on store: {name}")]
    NotFound { name: String },

    #[error("Failed to list snapshots: {message}")]
    List { message: String },

    #[error("Failed to delete {name}: {message}")]
    Delete { name: String, message: String },
}

impl StoreError {
    pub fn write(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn read(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Read {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn list(message: impl ToString) -> Self {
        Self::List {
            message: message.to_string(),
        }
    }

    pub fn delete(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Delete {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Any failure inside a lifecycle cycle
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Temp file or directory handling outside the codec
    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn local_io(context: impl Into<String>, source: io::Error) -> Self {
        Self::LocalIo {
            context: context.into(),
            source,
        }
    }

    /// Classification used in cycle outcomes.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Archive(ArchiveError::Creation { .. }) => FailureKind::ArchiveCreation,
            Error::Archive(ArchiveError::Corrupt { .. }) => FailureKind::ArchiveCorrupt,
            Error::Archive(ArchiveError::Extract { .. }) => FailureKind::ArchiveExtract,
            Error::Store(StoreError::Write { .. }) => FailureKind::StoreWrite,
            Error::Store(StoreError::Read { .. }) => FailureKind::StoreRead,
            Error::Store(StoreError::NotFound { .. }) => FailureKind::StoreNotFound,
            Error::Store(StoreError::List { .. }) => FailureKind::StoreList,
            Error::Store(StoreError::Delete { .. }) => FailureKind::StoreDelete,
            Error::LocalIo { .. } => FailureKind::LocalIo,
        }
    }
}
