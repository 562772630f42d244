//! Bind-test liveness probing
//!
//! A connected UDP socket does not reliably report peer death: on some
//! platforms the ICMP "port unreachable" never reaches `send`, so a client
//! that exited looks healthy forever. Binding the client's source port
//! locally settles it: the bind succeeds only if no process holds the
//! port.

use crate::repeater::socket::make_socket;
use crate::repeater::table::ClientTable;
use std::io;
use tracing::{debug, warn};

/// Walk the table and reap every client whose source port can be rebound.
///
/// Runs after a new client is inserted and after any fan-out pass that saw
/// a refused send. A bind failure other than address-in-use keeps the
/// client; reaping on an ambiguous probe would drop a live peer.
pub fn verify_clients<S>(clients: &mut ClientTable<S>) {
    let candidates = clients.drain();
    let mut survivors = Vec::with_capacity(candidates.len());

    for record in candidates {
        match make_socket(record.port(), false) {
            Ok(test_sock) => {
                // nobody holds the port, the client is gone
                debug!(port = record.port(), "reaping dead client");
                drop(test_sock);
                drop(record);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                survivors.push(record);
            }
            Err(e) => {
                warn!(error = %e, port = record.port(), "liveness bind test failed");
                survivors.push(record);
            }
        }
    }

    clients.concat(survivors);
}
