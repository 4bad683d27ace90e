//! Unix socket path hygiene: stale-file probing before bind and removal on
//! drop.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixDatagram, UnixStream};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use super::{TRANSPORT_TARGET, TransportError};

/// Socket kind tried when a path already exists.
#[derive(Debug, Clone, Copy)]
pub(super) enum SocketKind {
    Stream,
    Datagram,
}

/// Clears the way for binding at `path`.
///
/// A socket nobody answers on is stale and removed. A live socket or a
/// non-socket file is refused.
pub(super) fn claim_path(path: &Utf8Path, kind: SocketKind) -> Result<(), TransportError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(TransportError::UnixMetadata {
                path: path.to_owned(),
                source,
            });
        }
    };
    if !metadata.file_type().is_socket() {
        return Err(TransportError::UnixNotSocket {
            path: path.to_owned(),
        });
    }

    match connect_existing(path, kind) {
        Ok(()) => Err(TransportError::UnixInUse {
            path: path.to_owned(),
        }),
        Err(error)
            if error.kind() == io::ErrorKind::ConnectionRefused
                || error.kind() == io::ErrorKind::NotFound =>
        {
            info!(target: TRANSPORT_TARGET, path = %path, "removing stale unix socket");
            fs::remove_file(path).map_err(|source| TransportError::UnixCleanup {
                path: path.to_owned(),
                source,
            })
        }
        Err(source) => Err(TransportError::UnixConnect {
            path: path.to_owned(),
            source,
        }),
    }
}

fn connect_existing(path: &Utf8Path, kind: SocketKind) -> io::Result<()> {
    match kind {
        SocketKind::Stream => UnixStream::connect(path).map(drop),
        SocketKind::Datagram => UnixDatagram::unbound()?.connect(path),
    }
}

/// Removes the socket file it names when dropped.
#[derive(Debug)]
pub(super) struct SocketFile {
    path: Utf8PathBuf,
}

impl SocketFile {
    pub(super) fn new(path: &Utf8Path) -> Self {
        Self {
            path: path.to_owned(),
        }
    }

    pub(super) fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for SocketFile {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: TRANSPORT_TARGET,
                error = %error,
                path = %self.path,
                "failed to remove unix socket file"
            );
        }
    }
}
