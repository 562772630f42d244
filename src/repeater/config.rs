//! Repeater configuration
//!
//! Provides CLI argument parsing and validation for the repeater daemon.
//! The one knob that matters is the service port; it resolves in the order
//! command-line flag, `EPICS_CA_REPEATER_PORT` environment variable,
//! compiled-in default.

use crate::repeater::error::{RepeaterError, Result};
use clap::Parser;
use tracing::{debug, Level};

/// Well-known repeater port when nothing overrides it
pub const CA_REPEATER_PORT: u16 = 5065;

#[derive(Parser, Debug, Clone)]
#[command(name = "ca-repeater")]
#[command(about = "Channel Access broadcast repeater")]
pub struct Config {
    /// UDP port the repeater serves on
    #[arg(long, env = "EPICS_CA_REPEATER_PORT", default_value_t = CA_REPEATER_PORT)]
    pub port: u16,

    /// Activity summary interval in seconds (0 disables the monitor thread)
    #[arg(long, default_value_t = 60)]
    pub monitor_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl Config {
    /// Check the knobs before any socket is created.
    ///
    /// `monitor_interval` needs no check: zero is the documented way to
    /// switch the monitor thread off, and the log format is constrained
    /// by its value parser.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(RepeaterError::Config(
                "port 0 is reserved for ephemeral binds; the service port must be fixed".into(),
            ));
        }

        if self.log_level.parse::<Level>().is_err() {
            return Err(RepeaterError::Config(format!(
                "unrecognized log level {:?}",
                self.log_level
            )));
        }

        debug!(port = self.port, "repeater configuration accepted");
        Ok(())
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.to_lowercase() == "json"
    }
}
