//! The dispatch loop: one service socket, one thread, forever

use crate::protocol::message::{CaHeader, ETHERNET_MAX_UDP, HEADER_SIZE, REPEATER_REGISTER};
use crate::repeater::config::Config;
use crate::repeater::error::{RepeaterError, Result};
use crate::repeater::fanout::fan_out;
use crate::repeater::registrar::{register_client, LocalityProbe};
use crate::repeater::socket::make_socket;
use crate::repeater::stats::{RepeaterCounters, RepeaterMonitor};
use crate::repeater::table::ClientTable;
use std::io;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{error, info};

/// How one inbound datagram is to be handled.
#[derive(Debug, PartialEq, Eq)]
enum Dispatch<'a> {
    /// Register the sender; nothing to forward.
    Register,
    /// Register the sender, then forward the bytes after the stripped
    /// register header.
    RegisterThenForward(&'a [u8]),
    /// Forward the whole datagram untouched.
    Forward(&'a [u8]),
}

/// Classify one datagram.
///
/// A zero-length datagram and a header-sized-or-larger datagram whose
/// first command is REPEATER_REGISTER both register the sender; anything
/// else, including short non-empty datagrams, is forwarded verbatim.
fn classify(datagram: &[u8]) -> Dispatch<'_> {
    if datagram.is_empty() {
        return Dispatch::Register;
    }

    if CaHeader::peek_command(datagram) == Some(REPEATER_REGISTER) {
        let rest = &datagram[HEADER_SIZE..];
        if rest.is_empty() {
            return Dispatch::Register;
        }
        return Dispatch::RegisterThenForward(rest);
    }

    Dispatch::Forward(datagram)
}

/// The repeater: the service socket, the client table, the locality
/// probe, and the receive buffer, alive for the whole process.
pub struct Repeater {
    service: UdpSocket,
    port: u16,
    clients: ClientTable<UdpSocket>,
    locality: LocalityProbe,
    counters: RepeaterCounters,
    buf: [u8; ETHERNET_MAX_UDP],
}

impl Repeater {
    /// Bind the service socket on `(0.0.0.0, port)` with address reuse.
    ///
    /// An address-in-use failure is the distinguished "another repeater is
    /// already serving this host" outcome; everything else is a fatal
    /// startup error.
    pub fn bind(port: u16) -> Result<Self> {
        if port == 0 {
            return Err(RepeaterError::Config("repeater port must be nonzero".into()));
        }

        let service = match make_socket(port, true) {
            Ok(sock) => UdpSocket::from(sock),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                return Err(RepeaterError::PortInUse(port));
            }
            Err(e) => return Err(RepeaterError::Io(e)),
        };

        Ok(Self {
            service,
            port,
            clients: ClientTable::new(),
            locality: LocalityProbe::new(),
            counters: RepeaterCounters::new(),
            buf: [0u8; ETHERNET_MAX_UDP],
        })
    }

    /// Shared handles to the activity counters, for a monitor.
    pub fn counters(&self) -> RepeaterCounters {
        self.counters.clone()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Block on the service socket and dispatch datagrams forever.
    ///
    /// Nothing escapes this loop: every per-datagram error is recovered
    /// locally.
    pub fn run(&mut self) -> ! {
        info!(port = self.port, "CA repeater attached and initialized");

        loop {
            let (size, src) = match self.service.recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    // a stale asynchronous send error surfacing on the
                    // receive socket; nothing to act on
                    continue;
                }
                Err(e) => {
                    self.counters.increment_recv_errors();
                    error!(error = %e, "unexpected UDP recv error");
                    continue;
                }
            };

            let SocketAddr::V4(from) = src else {
                continue;
            };

            self.counters.increment_received();
            self.handle_datagram(size, from);
        }
    }

    fn handle_datagram(&mut self, size: usize, from: SocketAddrV4) {
        match classify(&self.buf[..size]) {
            Dispatch::Register => {
                self.counters.increment_registrations();
                register_client(&mut self.clients, &mut self.locality, from);
            }
            Dispatch::RegisterThenForward(payload) => {
                self.counters.increment_registrations();
                register_client(&mut self.clients, &mut self.locality, from);
                self.counters.increment_fanned_out();
                fan_out(&mut self.clients, from, payload);
            }
            Dispatch::Forward(payload) => {
                self.counters.increment_fanned_out();
                fan_out(&mut self.clients, from, payload);
            }
        }
    }
}

/// External supervision hook: the entry point hands over its thread id
/// before entering the dispatch loop.
pub trait Watchdog {
    fn register(&self, thread: ThreadId);
}

/// Entry point for running the repeater on a dedicated thread.
///
/// Registers with the watchdog when one is supplied, then binds and runs
/// indefinitely. Returns only on startup failure, and both failure paths
/// are clean from the process's point of view: a bound port means another
/// repeater is already serving this host, and anything else is left to
/// the supervisor to retry.
pub fn repeater_thread(config: &Config, watchdog: Option<&dyn Watchdog>) {
    if let Some(watchdog) = watchdog {
        watchdog.register(thread::current().id());
    }

    match Repeater::bind(config.port) {
        Ok(mut repeater) => {
            if config.monitor_interval > 0 {
                let monitor = RepeaterMonitor::new(
                    repeater.counters(),
                    Duration::from_secs(config.monitor_interval),
                );
                monitor.start_logging();
            }
            repeater.run()
        }
        Err(RepeaterError::PortInUse(port)) => {
            info!(port, "repeater port in use, another repeater is already running");
        }
        Err(e) => {
            error!(error = %e, "unable to create repeater socket - fatal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::CA_PROTO_NOOP;
    use std::sync::mpsc;

    fn register_datagram() -> [u8; HEADER_SIZE] {
        CaHeader {
            command: REPEATER_REGISTER,
            ..CaHeader::default()
        }
        .encode()
    }

    #[test]
    fn test_classify_empty_datagram_registers() {
        assert_eq!(classify(&[]), Dispatch::Register);
    }

    #[test]
    fn test_classify_register_header_alone() {
        let datagram = register_datagram();
        assert_eq!(classify(&datagram), Dispatch::Register);
    }

    #[test]
    fn test_classify_register_with_payload_strips_header() {
        let mut datagram = register_datagram().to_vec();
        datagram.extend_from_slice(b"trailing beacon bytes");

        match classify(&datagram) {
            Dispatch::RegisterThenForward(rest) => assert_eq!(rest, b"trailing beacon bytes"),
            other => panic!("expected RegisterThenForward, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_other_commands_forward_whole_datagram() {
        let datagram = CaHeader {
            command: CA_PROTO_NOOP,
            ..CaHeader::default()
        }
        .encode();
        assert_eq!(classify(&datagram), Dispatch::Forward(&datagram[..]));
    }

    #[test]
    fn test_classify_short_datagram_forwards_verbatim() {
        // too short to carry a header, so the command is never inspected
        let datagram = [REPEATER_REGISTER as u8; 5];
        assert_eq!(classify(&datagram), Dispatch::Forward(&datagram[..]));
    }

    #[test]
    fn test_second_bind_on_same_port_is_refused() {
        let first = loop {
            let port = {
                let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
                probe.local_addr().unwrap().port()
            };
            if let Ok(repeater) = Repeater::bind(port) {
                break repeater;
            }
        };

        match Repeater::bind(first.port()) {
            Err(RepeaterError::PortInUse(port)) => assert_eq!(port, first.port()),
            other => panic!("expected PortInUse, got {:?}", other.map(|r| r.port())),
        }
    }

    #[test]
    fn test_repeater_thread_registers_with_watchdog() {
        struct Recorder(mpsc::Sender<ThreadId>);

        impl Watchdog for Recorder {
            fn register(&self, thread: ThreadId) {
                self.0.send(thread).unwrap();
            }
        }

        // occupy a port so the entry point returns after registering
        let holder = UdpSocket::bind("0.0.0.0:0").unwrap();
        let config = Config {
            port: holder.local_addr().unwrap().port(),
            monitor_interval: 0,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        };

        let (tx, rx) = mpsc::channel();
        repeater_thread(&config, Some(&Recorder(tx)));

        assert_eq!(rx.try_recv().unwrap(), thread::current().id());
    }
}
