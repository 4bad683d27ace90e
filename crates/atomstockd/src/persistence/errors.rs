//! Error types for the shared inventory backing file.

use std::io;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use thiserror::Error;

use crate::inventory::Element;

/// Errors surfaced while opening, locking or flushing the backing file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The file could not be opened or inspected.
    #[error("failed to open inventory file {path}: {source}")]
    Open {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A fresh file could not be extended to the record size.
    #[error("failed to size inventory file {path}: {source}")]
    Resize {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Acquiring the advisory lock failed.
    #[error("failed to lock inventory file {path}: {source}")]
    Lock {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Mapping the record into memory failed.
    #[error("failed to map inventory file {path}: {source}")]
    Map {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An existing file is shorter than one record.
    #[error("inventory file {path} holds {len} bytes; expected at least {expected}")]
    Truncated {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Observed length in bytes.
        len: u64,
        /// Required length in bytes.
        expected: u64,
    },
    /// A persisted counter is above the unit ceiling.
    #[error("inventory file {path} records {count} {element} units, above the ceiling")]
    Corrupt {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Element holding the invalid counter.
        element: Element,
        /// Invalid counter value.
        count: u64,
    },
    /// Writing the mapped record back to disk failed.
    #[error("failed to flush inventory file {path}: {source}")]
    Flush {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
