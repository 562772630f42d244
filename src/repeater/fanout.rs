//! Datagram replication to registered clients

use crate::repeater::prober::verify_clients;
use crate::repeater::socket::OutboundSocket;
use crate::repeater::table::ClientTable;
use std::io;
use std::net::SocketAddrV4;
use tracing::{trace, warn};

/// Replicate one datagram to every registered client except its sender.
///
/// The payload is already framed; it goes out byte-for-byte in table
/// order. A refused send only flags the table for a liveness pass: the
/// prober is the single removal path, so a record created moments ago by
/// the registrar cannot be reaped before its confirmation went out.
/// Delivery is best-effort: any other send error drops the datagram for
/// that one peer.
pub fn fan_out<S: OutboundSocket>(
    clients: &mut ClientTable<S>,
    source: SocketAddrV4,
    payload: &[u8],
) {
    let mut needs_verify = false;
    let records = clients.drain();

    for record in &records {
        // don't reflect back to the sender
        if record.source().port() == source.port() && record.source().ip() == source.ip() {
            continue;
        }

        match record.socket().send(payload) {
            Ok(_) => {
                trace!(port = record.port(), bytes = payload.len(), "fanned out");
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                needs_verify = true;
            }
            Err(e) => {
                warn!(error = %e, port = record.port(), "UDP fan out failed");
            }
        }
    }

    clients.concat(records);

    if needs_verify {
        verify_clients(clients);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repeater::socket::MockOutboundSocket;
    use crate::repeater::table::ClientRecord;
    use std::io::ErrorKind;
    use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

    fn addr(port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)
    }

    #[test]
    fn test_sender_is_suppressed() {
        let mut sender_sock = MockOutboundSocket::new();
        sender_sock.expect_send().times(0);

        let mut peer_sock = MockOutboundSocket::new();
        peer_sock
            .expect_send()
            .withf(|buf: &[u8]| buf == b"beacon")
            .times(1)
            .returning(|buf| Ok(buf.len()));

        let mut table = ClientTable::new();
        table.insert(ClientRecord::new(addr(4100), sender_sock));
        table.insert(ClientRecord::new(addr(4101), peer_sock));

        fan_out(&mut table, addr(4100), b"beacon");
    }

    #[test]
    fn test_same_port_different_address_is_not_suppressed() {
        let mut peer_sock = MockOutboundSocket::new();
        peer_sock.expect_send().times(1).returning(|buf| Ok(buf.len()));

        let mut table = ClientTable::new();
        table.insert(ClientRecord::new(addr(4100), peer_sock));

        // same port, different source address: must still be delivered
        let elsewhere = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 9), 4100);
        fan_out(&mut table, elsewhere, b"beacon");
    }

    #[test]
    fn test_refused_send_defers_deletion_to_prober() {
        // keep the port genuinely occupied so the liveness pass keeps the
        // record: the fan-out itself must never remove it
        let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();

        let mut refused = MockOutboundSocket::new();
        refused
            .expect_send()
            .times(1)
            .returning(|_| Err(io::Error::from(ErrorKind::ConnectionRefused)));

        let mut table = ClientTable::new();
        table.insert(ClientRecord::new(addr(port), refused));

        fan_out(&mut table, addr(1), b"beacon");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_refused_send_reaps_once_port_is_free() {
        let port = {
            let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };

        let mut refused = MockOutboundSocket::new();
        refused
            .expect_send()
            .times(1)
            .returning(|_| Err(io::Error::from(ErrorKind::ConnectionRefused)));

        let mut table = ClientTable::new();
        table.insert(ClientRecord::new(addr(port), refused));

        fan_out(&mut table, addr(1), b"beacon");
        assert!(table.is_empty());
    }

    #[test]
    fn test_transient_error_keeps_client_and_continues() {
        let mut failing = MockOutboundSocket::new();
        failing
            .expect_send()
            .times(1)
            .returning(|_| Err(io::Error::from(ErrorKind::WouldBlock)));

        let mut healthy = MockOutboundSocket::new();
        healthy.expect_send().times(1).returning(|buf| Ok(buf.len()));

        let mut table = ClientTable::new();
        table.insert(ClientRecord::new(addr(4100), failing));
        table.insert(ClientRecord::new(addr(4101), healthy));

        fan_out(&mut table, addr(1), b"beacon");
        assert_eq!(table.len(), 2);
    }
}
