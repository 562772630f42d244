//! CA broadcast repeater
//!
//! Operating-system sockets deliver a broadcast or unicast UDP packet to at
//! most one bound socket on the host, so co-resident Channel Access client
//! processes cannot independently observe the same beacon traffic. This
//! library implements the cooperating process that can: a single-threaded
//! daemon that accepts registrations from local clients and fans every
//! inbound datagram out to all of them.

pub mod protocol;
pub mod repeater;
