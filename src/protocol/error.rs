use thiserror::Error;

/// Protocol-level errors for header encoding/decoding
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("datagram too short for a message header: expected {expected}, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
