//! UDP socket creation with uniform error reporting
//!
//! Everything the repeater owns (the service socket, the per-client
//! outbound sockets, the bind-test sockets) comes out of one factory so
//! that bind failures surface the OS error verbatim. Callers branch on
//! `ErrorKind::AddrInUse`: fatal for the service socket, "client still
//! alive" for the liveness prober.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use tracing::warn;

/// Port 0: let the OS pick, and skip binding entirely
pub const PORT_ANY: u16 = 0;

/// Create an IPv4 UDP socket, optionally bound to `(0.0.0.0, port)`.
///
/// With `PORT_ANY` the socket is returned unbound; callers connect it or
/// bind it to a specific address later. With a real port the bind happens
/// here and a failure returns the OS error untouched, closing the socket.
/// `SO_REUSEADDR` is applied only to bound sockets and only on request;
/// a failure to set it is logged, not fatal.
pub fn make_socket(port: u16, reuse_addr: bool) -> io::Result<Socket> {
    let sock = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    if port != PORT_ANY {
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        sock.bind(&bind_addr.into())?;
        if reuse_addr {
            if let Err(e) = sock.set_reuse_address(true) {
                warn!(error = %e, port = port, "set socket option failed");
            }
        }
    }

    Ok(sock)
}

/// The send seam between the repeater and a registered client.
///
/// Production code sends on a connected `UdpSocket`; tests substitute a
/// mock to script refused and failing peers.
pub trait OutboundSocket {
    fn send(&self, buf: &[u8]) -> io::Result<usize>;
}

impl OutboundSocket for UdpSocket {
    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, buf)
    }
}


#[cfg(test)]
pub use tests::MockOutboundSocket;
