use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepeaterError {
    /// The service port is already bound, meaning another repeater is
    /// serving this host; treated as a clean startup outcome.
    #[error("repeater port {0} is already in use (another repeater is running)")]
    PortInUse(u16),

    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RepeaterError>;
