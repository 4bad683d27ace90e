//! Inventory storage shared between daemon processes.
//!
//! Without a save file the inventory lives in process memory. With one, the
//! counters live in a 24-byte record mapped `MAP_SHARED`, so every process
//! that maps the same file sees the same bytes. Each access is bracketed by
//! an advisory `flock`: shared for reads, exclusive for read-modify-write.

mod errors;
mod record;
#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

use camino::{Utf8Path, Utf8PathBuf};
use memmap2::{MmapMut, MmapOptions};
use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

pub use self::errors::PersistenceError;
use self::record::{RECORD_FILE_LEN, RECORD_LEN, decode, encode};
use crate::inventory::Inventory;

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// How an on-disk inventory was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The file was empty and has been seeded.
    Initialised,
    /// The file already held a record; seeds were ignored.
    Loaded,
}

/// Handle to the authoritative inventory.
#[derive(Debug)]
pub struct StockStore {
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    Local(Inventory),
    Mapped(MappedRecord),
}

#[derive(Debug)]
struct MappedRecord {
    path: Utf8PathBuf,
    file: File,
    map: MmapMut,
}

impl StockStore {
    /// Keeps the inventory in process memory only.
    #[must_use]
    pub const fn in_memory(seed: Inventory) -> Self {
        Self {
            backing: Backing::Local(seed),
        }
    }

    /// Opens or creates the shared backing file at `path`.
    ///
    /// An empty file is extended to one record and seeded with `seed`; an
    /// existing record is loaded as-is. Both happen under an exclusive lock
    /// so concurrent starters cannot seed the same file twice.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the file cannot be opened, locked,
    /// sized or mapped, or if an existing record is short or out of range.
    pub fn open(path: &Utf8Path, seed: Inventory) -> Result<(Self, OpenOutcome), PersistenceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(path)
            .map_err(|source| PersistenceError::Open {
                path: path.to_owned(),
                source,
            })?;

        let guard = acquire(&file, path, FlockArg::LockExclusive)?;
        let len = guard
            .metadata()
            .map_err(|source| PersistenceError::Open {
                path: path.to_owned(),
                source,
            })?
            .len();

        let outcome = if len == 0 {
            file.set_len(RECORD_FILE_LEN)
                .map_err(|source| PersistenceError::Resize {
                    path: path.to_owned(),
                    source,
                })?;
            OpenOutcome::Initialised
        } else if len < RECORD_FILE_LEN {
            return Err(PersistenceError::Truncated {
                path: path.to_owned(),
                len,
                expected: RECORD_FILE_LEN,
            });
        } else {
            OpenOutcome::Loaded
        };

        // SAFETY: the mapping covers the first record only, the file is held
        // open for the lifetime of the map, and every access to the mapped
        // bytes is bracketed by an advisory lock on the same file.
        let map = unsafe { MmapOptions::new().len(RECORD_LEN).map_mut(&file) }.map_err(
            |source| PersistenceError::Map {
                path: path.to_owned(),
                source,
            },
        )?;

        let mut mapped = MappedRecord {
            path: path.to_owned(),
            file,
            map,
        };
        match outcome {
            OpenOutcome::Initialised => encode(&seed, &mut mapped.map),
            OpenOutcome::Loaded => {
                mapped.load()?;
            }
        }
        drop(guard);
        debug!(target: STORE_TARGET, %path, ?outcome, "backing file mapped");

        let store = Self {
            backing: Backing::Mapped(mapped),
        };
        Ok((store, outcome))
    }

    /// Path of the backing file, or `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match &self.backing {
            Backing::Local(_) => None,
            Backing::Mapped(mapped) => Some(&mapped.path),
        }
    }

    /// Runs `inspect` against a consistent snapshot under a shared lock.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the lock cannot be taken or the
    /// persisted record is out of range.
    pub fn read<R>(&self, inspect: impl FnOnce(&Inventory) -> R) -> Result<R, PersistenceError> {
        match &self.backing {
            Backing::Local(inventory) => Ok(inspect(inventory)),
            Backing::Mapped(mapped) => {
                let _guard = acquire(&mapped.file, &mapped.path, FlockArg::LockShared)?;
                let inventory = mapped.load()?;
                Ok(inspect(&inventory))
            }
        }
    }

    /// Runs `mutate` as one read-modify-write under an exclusive lock.
    ///
    /// Whatever state `mutate` leaves behind is written back before the lock
    /// is released.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the lock cannot be taken or the
    /// persisted record is out of range.
    pub fn write<R>(
        &mut self,
        mutate: impl FnOnce(&mut Inventory) -> R,
    ) -> Result<R, PersistenceError> {
        match &mut self.backing {
            Backing::Local(inventory) => Ok(mutate(inventory)),
            Backing::Mapped(mapped) => {
                let _guard = acquire(&mapped.file, &mapped.path, FlockArg::LockExclusive)?;
                let mut inventory = mapped.load()?;
                let result = mutate(&mut inventory);
                encode(&inventory, &mut mapped.map);
                Ok(result)
            }
        }
    }

    /// Flushes the mapped record to disk and releases the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Flush`] if the record cannot be written
    /// back.
    pub fn close(self) -> Result<(), PersistenceError> {
        match self.backing {
            Backing::Local(_) => Ok(()),
            Backing::Mapped(MappedRecord { path, map, .. }) => {
                map.flush()
                    .map_err(|source| PersistenceError::Flush {
                        path: path.clone(),
                        source,
                    })?;
                debug!(target: STORE_TARGET, %path, "backing file flushed and unmapped");
                Ok(())
            }
        }
    }
}

impl MappedRecord {
    fn load(&self) -> Result<Inventory, PersistenceError> {
        let inventory = decode(&self.map).ok_or_else(|| PersistenceError::Truncated {
            path: self.path.clone(),
            len: 0,
            expected: RECORD_FILE_LEN,
        })?;
        if let Some(element) = inventory.first_out_of_range() {
            return Err(PersistenceError::Corrupt {
                path: self.path.clone(),
                element,
                count: inventory.held(element),
            });
        }
        Ok(inventory)
    }
}

fn acquire(file: &File, path: &Utf8Path, mode: FlockArg) -> Result<Flock<File>, PersistenceError> {
    let handle = file.try_clone().map_err(|source| PersistenceError::Open {
        path: path.to_owned(),
        source,
    })?;
    Flock::lock(handle, mode).map_err(|(_, source)| PersistenceError::Lock {
        path: path.to_owned(),
        source,
    })
}
