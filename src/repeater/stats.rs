//! Lock-free activity accounting for the dispatch loop
//!
//! The dispatch loop only bumps atomic counters on its hot path; a
//! background thread turns them into a periodic structured log line. The
//! loop never waits on the monitor and the monitor never touches the
//! table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Counters updated from the dispatch loop.
///
/// Clones share the underlying atomics, so a monitor observes the loop
/// without locks. `Relaxed` ordering is all a plain counter needs.
#[derive(Clone, Debug, Default)]
pub struct RepeaterCounters {
    datagrams_received: Arc<AtomicU64>,
    datagrams_fanned_out: Arc<AtomicU64>,
    registrations: Arc<AtomicU64>,
    recv_errors: Arc<AtomicU64>,
}

impl RepeaterCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_fanned_out(&self) {
        self.datagrams_fanned_out.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_registrations(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_recv_errors(&self) {
        self.recv_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_fanned_out: self.datagrams_fanned_out.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub datagrams_received: u64,
    pub datagrams_fanned_out: u64,
    pub registrations: u64,
    pub recv_errors: u64,
}

/// Emits an activity summary whenever something happened since the last
/// interval. A quiet repeater stays quiet in the logs too.
pub struct RepeaterMonitor {
    counters: RepeaterCounters,
    interval: Duration,
}

impl RepeaterMonitor {
    pub fn new(counters: RepeaterCounters, interval: Duration) -> Self {
        Self { counters, interval }
    }

    /// Start the background summary thread.
    pub fn start_logging(&self) {
        let counters = self.counters.clone();
        let interval = self.interval;

        thread::spawn(move || {
            let mut last = counters.snapshot();
            loop {
                thread::sleep(interval);

                let current = counters.snapshot();
                if current != last {
                    debug!(
                        datagrams_received = current.datagrams_received,
                        datagrams_fanned_out = current.datagrams_fanned_out,
                        registrations = current.registrations,
                        recv_errors = current.recv_errors,
                        "repeater activity"
                    );
                    last = current;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_counters() {
        let counters = RepeaterCounters::new();
        let handle = counters.clone();

        handle.increment_received();
        handle.increment_received();
        handle.increment_fanned_out();
        handle.increment_registrations();
        handle.increment_recv_errors();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.datagrams_fanned_out, 1);
        assert_eq!(snapshot.registrations, 1);
        assert_eq!(snapshot.recv_errors, 1);
    }

    #[test]
    fn test_snapshot_equality_detects_quiet_intervals() {
        let counters = RepeaterCounters::new();
        let before = counters.snapshot();
        assert_eq!(before, counters.snapshot());

        counters.increment_received();
        assert_ne!(before, counters.snapshot());
    }
}
