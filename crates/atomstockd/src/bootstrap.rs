//! Daemon bootstrap orchestration.

use std::sync::Arc;

use thiserror::Error;

use atomstock_config::{Config, ConfigError, SocketPreparationError};

use crate::health::HealthReporter;
use crate::inventory::{Inventory, StockError};
use crate::lifecycle::{ShutdownError, ShutdownFlag};
use crate::persistence::{PersistenceError, StockStore};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{BoundPair, TransportError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that validates and returns a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A seed count exceeded the per-element ceiling.
    #[error("invalid seed counts: {source}")]
    Seed {
        /// Underlying domain error.
        #[source]
        source: StockError,
    },
    /// Socket directory preparation failed.
    #[error("failed to prepare socket directory: {source}")]
    Socket {
        /// Filesystem error reported while preparing a socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The shared backing file could not be opened.
    #[error("failed to open inventory store: {source}")]
    Persistence {
        /// Underlying store error.
        #[source]
        source: PersistenceError,
    },
    /// An endpoint failed to bind.
    #[error("failed to bind endpoints: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
    /// Termination signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying installation error.
        #[source]
        source: ShutdownError,
    },
}

/// Result of a successful bootstrap invocation.
///
/// Holds every resource the dispatcher needs: the open store, the bound
/// endpoints and the shutdown latch.
pub struct Daemon {
    config: Config,
    store: StockStore,
    endpoints: Vec<BoundPair>,
    shutdown: ShutdownFlag,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The open inventory store.
    #[must_use]
    pub const fn store(&self) -> &StockStore {
        &self.store
    }

    /// Bound endpoint pairs in configuration order.
    #[must_use]
    pub fn endpoints(&self) -> &[BoundPair] {
        &self.endpoints
    }

    /// Latch raised by termination signals.
    #[must_use]
    pub const fn shutdown_flag(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    pub(crate) fn into_parts(self) -> DaemonParts {
        DaemonParts {
            config: self.config,
            store: self.store,
            endpoints: self.endpoints,
            shutdown: self.shutdown,
            reporter: self.reporter,
        }
    }
}

/// Owned pieces handed to the launch sequence.
pub(crate) struct DaemonParts {
    pub(crate) config: Config,
    pub(crate) store: StockStore,
    pub(crate) endpoints: Vec<BoundPair>,
    pub(crate) shutdown: ShutdownFlag,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads configuration, starts telemetry, opens the inventory store, binds
/// every configured endpoint pair and installs termination signal handlers.
/// Resources acquired before a failure are released on return.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered; the reporter sees it
/// too.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match acquire(loader, &reporter) {
        Ok((config, telemetry, store, endpoints, shutdown)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                store,
                endpoints,
                shutdown,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

type Acquired = (Config, TelemetryHandle, StockStore, Vec<BoundPair>, ShutdownFlag);

fn acquire(
    loader: &dyn ConfigLoader,
    reporter: &Arc<dyn HealthReporter>,
) -> Result<Acquired, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let counts = config.seed();
    let seed = Inventory::seeded(counts.carbon, counts.hydrogen, counts.oxygen)
        .map_err(|source| BootstrapError::Seed { source })?;

    let store = match config.save_file() {
        Some(path) => {
            let (opened, outcome) = StockStore::open(path, seed)
                .map_err(|source| BootstrapError::Persistence { source })?;
            reporter.store_opened(Some(path.as_str()), Some(outcome));
            opened
        }
        None => {
            reporter.store_opened(None, None);
            StockStore::in_memory(seed)
        }
    };

    let transports = config.transports();
    let mut endpoints = Vec::with_capacity(transports.len());
    for pair in &transports {
        pair.prepare_filesystem()
            .map_err(|source| BootstrapError::Socket { source })?;
        endpoints.push(BoundPair::bind(pair).map_err(|source| BootstrapError::Transport { source })?);
    }

    let shutdown = ShutdownFlag::new();
    shutdown
        .install_signal_handlers()
        .map_err(|source| BootstrapError::Signals { source })?;

    Ok((config, telemetry, store, endpoints, shutdown))
}
