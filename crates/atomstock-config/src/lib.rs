//! Shared configuration for the atomstock daemon.
//!
//! Every option can be supplied as a command-line flag or through an
//! `ATOMSTOCK_*` environment variable; flags win over the environment.
//! Loading validates that stream and datagram endpoints are configured in
//! matching pairs before the daemon binds anything.

mod defaults;
mod logging;
mod socket;

use std::ffi::OsString;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Parser};
use thiserror::Error;

pub use defaults::{DEFAULT_BIND_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_CLIENTS};
pub use logging::LogFormat;
pub use socket::{SocketPreparationError, TransportPair};

/// Initial counter values applied when no persisted inventory exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedCounts {
    /// Initial carbon units.
    pub carbon: u64,
    /// Initial hydrogen units.
    pub hydrogen: u64,
    /// Initial oxygen units.
    pub oxygen: u64,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "atomstockd",
    version,
    about = "Atom inventory daemon serving ADD, DELIVER and GEN commands",
    disable_help_flag = true
)]
pub struct Config {
    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
    /// TCP port accepting `ADD` connections.
    #[arg(
        short = 'T',
        long = "tcp-port",
        env = "ATOMSTOCK_TCP_PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub tcp_port: Option<u16>,
    /// UDP port receiving `DELIVER` datagrams.
    #[arg(
        short = 'U',
        long = "udp-port",
        env = "ATOMSTOCK_UDP_PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub udp_port: Option<u16>,
    /// Interface the network endpoints bind to.
    #[arg(long, env = "ATOMSTOCK_HOST", default_value = DEFAULT_BIND_HOST)]
    pub host: String,
    /// Unix stream socket path accepting `ADD` connections.
    #[arg(short = 's', long = "stream-path", env = "ATOMSTOCK_STREAM_PATH")]
    pub stream_path: Option<Utf8PathBuf>,
    /// Unix datagram socket path receiving `DELIVER` datagrams.
    #[arg(short = 'd', long = "datagram-path", env = "ATOMSTOCK_DATAGRAM_PATH")]
    pub datagram_path: Option<Utf8PathBuf>,
    /// Initial carbon units.
    #[arg(short = 'c', long, env = "ATOMSTOCK_CARBON", default_value_t = 0)]
    pub carbon: u64,
    /// Initial hydrogen units.
    #[arg(short = 'h', long, env = "ATOMSTOCK_HYDROGEN", default_value_t = 0)]
    pub hydrogen: u64,
    /// Initial oxygen units.
    #[arg(short = 'o', long, env = "ATOMSTOCK_OXYGEN", default_value_t = 0)]
    pub oxygen: u64,
    /// Seconds of inactivity before the daemon shuts down; 0 disables.
    #[arg(short = 't', long = "timeout", env = "ATOMSTOCK_TIMEOUT", default_value_t = 0)]
    pub timeout_secs: u64,
    /// File backing a shared, persistent inventory.
    #[arg(short = 'f', long = "save-file", env = "ATOMSTOCK_SAVE_FILE")]
    pub save_file: Option<Utf8PathBuf>,
    /// Maximum simultaneously connected stream clients.
    #[arg(long, env = "ATOMSTOCK_MAX_CLIENTS", default_value_t = DEFAULT_MAX_CLIENTS)]
    pub max_clients: usize,
    /// Tracing filter expression.
    #[arg(long, env = "ATOMSTOCK_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format (`compact` or `json`).
    #[arg(long, env = "ATOMSTOCK_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            help: None,
            tcp_port: None,
            udp_port: None,
            host: DEFAULT_BIND_HOST.to_owned(),
            stream_path: None,
            datagram_path: None,
            carbon: 0,
            hydrogen: 0,
            oxygen: 0,
            timeout_secs: 0,
            save_file: None,
            max_clients: DEFAULT_MAX_CLIENTS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when clap rejects the arguments (including
    /// `--help` and `--version`) and a validation error otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the binary name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or [`Config::validate`] fails.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args).map_err(ConfigError::Cli)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks endpoint pairing and client limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnpairedNetwork`] or
    /// [`ConfigError::UnpairedLocal`] for a half-configured pair,
    /// [`ConfigError::NoTransport`] when no pair is configured and
    /// [`ConfigError::NoClientCapacity`] for a zero client limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.tcp_port, self.udp_port) {
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::UnpairedNetwork),
            _ => {}
        }
        match (&self.stream_path, &self.datagram_path) {
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::UnpairedLocal),
            _ => {}
        }
        if self.transports().is_empty() {
            return Err(ConfigError::NoTransport);
        }
        if self.max_clients == 0 {
            return Err(ConfigError::NoClientCapacity);
        }
        Ok(())
    }

    /// Configured endpoint pairs in binding order.
    #[must_use]
    pub fn transports(&self) -> Vec<TransportPair> {
        let mut pairs = Vec::new();
        if let (Some(stream_port), Some(datagram_port)) = (self.tcp_port, self.udp_port) {
            pairs.push(TransportPair::network(
                self.host.clone(),
                stream_port,
                datagram_port,
            ));
        }
        if let (Some(stream_path), Some(datagram_path)) = (&self.stream_path, &self.datagram_path)
        {
            pairs.push(TransportPair::local(
                stream_path.clone(),
                datagram_path.clone(),
            ));
        }
        pairs
    }

    /// Inactivity window, or `None` when the timeout is disabled.
    #[must_use]
    pub const fn inactivity_timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    /// Seed counters supplied on the command line.
    #[must_use]
    pub const fn seed(&self) -> SeedCounts {
        SeedCounts {
            carbon: self.carbon,
            hydrogen: self.hydrogen,
            oxygen: self.oxygen,
        }
    }

    /// Path of the shared backing file, if configured.
    #[must_use]
    pub fn save_file(&self) -> Option<&Utf8Path> {
        self.save_file.as_deref()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line or environment parsing failed (also covers `--help`).
    #[error(transparent)]
    Cli(clap::Error),
    /// Only one of the TCP and UDP ports was supplied.
    #[error("TCP and UDP ports must be configured together (-T and -U)")]
    UnpairedNetwork,
    /// Only one of the Unix stream and datagram paths was supplied.
    #[error("Unix stream and datagram paths must be configured together (-s and -d)")]
    UnpairedLocal,
    /// No endpoint pair was configured.
    #[error("no transport configured: supply -T/-U ports or -s/-d socket paths")]
    NoTransport,
    /// The client limit was zero.
    #[error("max clients must be at least 1")]
    NoClientCapacity,
}
