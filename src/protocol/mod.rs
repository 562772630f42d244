//! Channel Access wire protocol pieces the repeater needs

pub mod error;
pub mod message;

pub use error::{ProtocolError, Result as ProtocolResult};
pub use message::{
    CaHeader, CA_PROTO_NOOP, ETHERNET_MAX_UDP, HEADER_SIZE, REPEATER_CONFIRM, REPEATER_REGISTER,
};
