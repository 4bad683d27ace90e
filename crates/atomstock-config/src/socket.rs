use std::fmt;
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// A matched stream/datagram endpoint pair.
///
/// Stream and datagram endpoints are always configured together and always
/// share an address family: either both listen on network ports or both live
/// at filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportPair {
    /// TCP listener plus UDP endpoint on the same host.
    Network {
        /// Interface both sockets bind to.
        host: String,
        /// TCP port accepting `ADD` connections.
        stream_port: u16,
        /// UDP port receiving `DELIVER` datagrams.
        datagram_port: u16,
    },
    /// Unix stream listener plus Unix datagram endpoint.
    Local {
        /// Filesystem path of the stream socket.
        stream_path: Utf8PathBuf,
        /// Filesystem path of the datagram socket.
        datagram_path: Utf8PathBuf,
    },
}

impl TransportPair {
    /// Builds a network pair.
    #[must_use]
    pub fn network(host: impl Into<String>, stream_port: u16, datagram_port: u16) -> Self {
        Self::Network {
            host: host.into(),
            stream_port,
            datagram_port,
        }
    }

    /// Builds a filesystem-addressed pair.
    #[must_use]
    pub fn local(stream_path: impl Into<Utf8PathBuf>, datagram_path: impl Into<Utf8PathBuf>) -> Self {
        Self::Local {
            stream_path: stream_path.into(),
            datagram_path: datagram_path.into(),
        }
    }

    /// Socket paths owned by this pair, empty for network pairs.
    #[must_use]
    pub fn socket_paths(&self) -> Vec<&Utf8Path> {
        match self {
            Self::Network { .. } => Vec::new(),
            Self::Local {
                stream_path,
                datagram_path,
            } => vec![stream_path.as_path(), datagram_path.as_path()],
        }
    }

    /// Ensures the parent directories of Unix socket paths exist.
    ///
    /// Missing directories are created owner-only (`0700`).
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when a path has no parent or a
    /// directory cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        for path in self.socket_paths() {
            prepare_parent(path)?;
        }
        Ok(())
    }
}

fn prepare_parent(path: &Utf8Path) -> Result<(), SocketPreparationError> {
    let Some(parent) = path.parent() else {
        return Err(SocketPreparationError::MissingParent {
            path: path.to_path_buf(),
        });
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true).mode(0o700);

    if let Err(source) = builder.create(parent.as_std_path())
        && source.kind() != std::io::ErrorKind::AlreadyExists
    {
        return Err(SocketPreparationError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        });
    }

    Ok(())
}

impl fmt::Display for TransportPair {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network {
                host,
                stream_port,
                datagram_port,
            } => write!(
                formatter,
                "tcp://{host}:{stream_port} + udp://{host}:{datagram_port}"
            ),
            Self::Local {
                stream_path,
                datagram_path,
            } => write!(formatter, "unix://{stream_path} + unixgram://{datagram_path}"),
        }
    }
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// The socket path has no parent component at all.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Offending socket path.
        path: Utf8PathBuf,
    },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
