//! Client registration: locality check, record creation, confirmation

use crate::protocol::message::{CaHeader, HEADER_SIZE};
use crate::repeater::fanout::fan_out;
use crate::repeater::prober::verify_clients;
use crate::repeater::socket::{make_socket, PORT_ANY};
use crate::repeater::table::{ClientRecord, ClientTable};
use socket2::{SockAddr, Socket};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use tracing::{debug, error, warn};

/// Bind-test vehicle proving that a claimed source address belongs to this
/// host.
///
/// There is no portable way to ask the OS whether an IP is one of its own;
/// binding to it answers the question. The socket is created on first need
/// and retained for the process lifetime. Creation is attempted once; if
/// it fails, non-loopback registrants stay refused.
pub struct LocalityProbe {
    sock: Option<Socket>,
    attempted: bool,
}

impl LocalityProbe {
    pub fn new() -> Self {
        Self {
            sock: None,
            attempted: false,
        }
    }

    /// True iff `ip` is the loopback address or an address of a local
    /// interface.
    pub fn is_local(&mut self, ip: Ipv4Addr) -> bool {
        if ip == Ipv4Addr::LOCALHOST {
            return true;
        }

        if !self.attempted {
            self.attempted = true;
            match make_socket(PORT_ANY, true) {
                Ok(sock) => self.sock = Some(sock),
                Err(e) => {
                    error!(error = %e, "unable to create locality bind-test socket");
                }
            }
        }

        let Some(sock) = &self.sock else {
            return false;
        };

        // a bind to (ip, ephemeral) can only succeed for a local address
        sock.bind(&SockAddr::from(SocketAddrV4::new(ip, PORT_ANY)))
            .is_ok()
    }
}

impl Default for LocalityProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Register (or refresh) the client at `from` and confirm it.
///
/// Proves locality, creates the connected outbound socket if this port is
/// new, sends the CONFIRM echoing the client's own address, then pokes
/// every other client with a NOOP so stale sockets get noticed even when
/// no beacons flow. For a brand-new client, and only after its
/// confirmation, a liveness pass runs last. Every failure is absorbed
/// here; a bad registrant never disturbs the dispatch loop.
pub fn register_client(
    clients: &mut ClientTable<UdpSocket>,
    locality: &mut LocalityProbe,
    from: SocketAddrV4,
) {
    // the repeater and its clients must be on the same host
    if !locality.is_local(*from.ip()) {
        debug!(source = %from, "refusing non-local registration");
        return;
    }

    let mut new_client = false;
    if clients.find_by_port(from.port()).is_none() {
        let sock = match make_socket(PORT_ANY, false) {
            Ok(sock) => sock,
            Err(e) => {
                error!(error = %e, source = %from, "no socket for new client");
                return;
            }
        };

        // refused sends must surface synchronously and never stall the loop
        if let Err(e) = sock.set_nonblocking(true) {
            error!(error = %e, source = %from, "unable to configure client socket");
            return;
        }

        if let Err(e) = sock.connect(&SockAddr::from(from)) {
            error!(error = %e, source = %from, "unable to connect client socket");
            return;
        }

        clients.insert(ClientRecord::new(from, sock.into()));
        new_client = true;
        debug!(source = %from, "added client");
    }

    let confirm = CaHeader::confirm(*from.ip()).encode();
    let status = clients
        .find_by_port(from.port())
        .map(|record| record.socket().send(&confirm));

    match status {
        Some(Ok(sent)) => {
            // a connected datagram socket takes the whole header or fails
            assert_eq!(sent, HEADER_SIZE, "short confirmation write");
        }
        Some(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            // the client died between registering and being confirmed
            debug!(source = %from, "client refused confirmation, removing");
            clients.remove_by_port(from.port());
        }
        Some(Err(e)) => {
            warn!(error = %e, source = %from, "confirm send failed");
        }
        None => {}
    }

    let noop = CaHeader::noop().encode();
    fan_out(clients, from, &noop);

    if new_client {
        // after the confirmation, so the newcomer is never eligible for
        // reaping before it has been confirmed
        verify_clients(clients);
    }
}
