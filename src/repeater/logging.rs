use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging with default settings
pub fn init_logging() {
    init_logging_with_config("info", false);
}

/// Initialize structured logging for the daemon.
///
/// An explicit `RUST_LOG` wins outright. Otherwise `log_level` applies to
/// this crate only and dependencies stay at `warn`, so running the
/// repeater at debug level does not drown the beacon traffic in library
/// noise.
///
/// # Arguments
///
/// * `log_level` - Level for `ca_repeater` targets (trace, debug, info, warn, error)
/// * `json_format` - One JSON object per line for log shippers, instead of compact text
pub fn init_logging_with_config(log_level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,ca_repeater={log_level}")));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        subscriber
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        // a long-lived daemon wants terse lines; the target says which
        // stage of the pipeline spoke
        subscriber
            .with(fmt::layer().compact().with_target(true))
            .init();
    }
}
