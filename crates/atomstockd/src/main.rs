//! Foreground entry point for the atom inventory daemon.

use std::process::ExitCode;

use atomstock_config::ConfigError;
use atomstockd::{BootstrapError, LaunchError};

fn main() -> ExitCode {
    match atomstockd::run_daemon() {
        Ok(_) => ExitCode::SUCCESS,
        Err(LaunchError::Bootstrap {
            source:
                BootstrapError::Configuration {
                    source: ConfigError::Cli(error),
                },
        }) => error.exit(),
        Err(error) if error.telemetry_ready() => {
            tracing::error!(target: "atomstockd", %error, "daemon exited with an error");
            ExitCode::FAILURE
        }
        Err(error) => {
            report_without_telemetry(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "no tracing subscriber exists when configuration or telemetry setup fails"
)]
fn report_without_telemetry(error: &LaunchError) {
    eprintln!("atomstockd: {error}");
}
