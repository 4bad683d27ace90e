//! Process-wide tracing output.
//!
//! Events are written to stderr so stdout stays free for console replies.
//! The first successful call installs the subscriber; the format chosen then
//! stays in effect for the life of the process.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use atomstock_config::{Config, LogFormat};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that telemetry is installed, carrying the format in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format chosen by the call that installed the subscriber.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter '{expression}': {source}")]
    InvalidFilter {
        /// Expression as configured.
        expression: String,
        /// Parser diagnostic.
        #[source]
        source: ParseError,
    },
    /// A subscriber not installed by this module already owns the process.
    #[error("another tracing subscriber is already installed: {source}")]
    Install {
        /// Error from the global registration.
        #[source]
        source: SetGlobalDefaultError,
    },
}

/// Installs stderr telemetry for `config` unless it is already installed.
///
/// The filter expression is checked on every call, so a bad filter is
/// reported even after an earlier call succeeded.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for an unparsable filter and
/// [`TelemetryError::Install`] when a foreign subscriber is registered.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    INSTALLED_FORMAT
        .get_or_try_init(|| install(filter, config.log_format()))
        .map(|format| TelemetryHandle { format: *format })
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::builder()
        .parse(expression)
        .map_err(|source| TelemetryError::InvalidFilter {
            expression: expression.to_owned(),
            source,
        })
}

fn install(filter: EnvFilter, format: LogFormat) -> Result<LogFormat, TelemetryError> {
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(output_layer(format));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|source| TelemetryError::Install { source })?;
    Ok(format)
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let stderr = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);
    match format {
        LogFormat::Json => stderr.json().flatten_event(true).boxed(),
        LogFormat::Compact => stderr.compact().boxed(),
    }
}
