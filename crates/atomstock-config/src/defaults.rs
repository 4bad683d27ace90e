/// Interface the network listeners bind to when no host is configured.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Maximum number of simultaneously connected stream clients.
pub const DEFAULT_MAX_CLIENTS: usize = 100;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";
