//! The repeater daemon: dispatch loop, client table, fan-out, liveness

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fanout;
pub mod logging;
pub mod prober;
pub mod registrar;
pub mod socket;
pub mod stats;
pub mod table;

pub use config::{Config, CA_REPEATER_PORT};
pub use dispatch::{repeater_thread, Repeater, Watchdog};
pub use error::{RepeaterError, Result};
pub use fanout::fan_out;
pub use logging::{init_logging, init_logging_with_config};
pub use prober::verify_clients;
pub use registrar::{register_client, LocalityProbe};
pub use socket::{make_socket, OutboundSocket, PORT_ANY};
pub use stats::{RepeaterCounters, RepeaterMonitor};
pub use table::{ClientRecord, ClientTable};
