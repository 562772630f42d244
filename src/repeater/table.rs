//! The client table: who gets copies of inbound traffic
//!
//! An insertion-ordered sequence of records, at most one per source port.
//! The fan-out and liveness passes walk it with a drain/concat discipline:
//! take ownership of every record, process, re-append the survivors. That
//! keeps removal trivially safe in a single-threaded loop and preserves
//! relative order, which is the only order fan-out promises.

use std::net::{SocketAddrV4, UdpSocket};

/// One registered client: its source address as seen on ingress, and the
/// outbound socket connected to it. The record owns the socket; dropping
/// the record closes it.
#[derive(Debug)]
pub struct ClientRecord<S = UdpSocket> {
    source: SocketAddrV4,
    sock: S,
}

impl<S> ClientRecord<S> {
    pub fn new(source: SocketAddrV4, sock: S) -> Self {
        Self { source, sock }
    }

    pub fn source(&self) -> SocketAddrV4 {
        self.source
    }

    /// The source port, the record's identity within the table.
    pub fn port(&self) -> u16 {
        self.source.port()
    }

    pub fn socket(&self) -> &S {
        &self.sock
    }
}

#[derive(Debug)]
pub struct ClientTable<S = UdpSocket> {
    records: Vec<ClientRecord<S>>,
}

impl<S> ClientTable<S> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record. Callers look up the port first; two records for
    /// one port would make fan-out deliver duplicates.
    pub fn insert(&mut self, record: ClientRecord<S>) {
        debug_assert!(
            self.find_by_port(record.port()).is_none(),
            "duplicate client record for port {}",
            record.port()
        );
        self.records.push(record);
    }

    pub fn find_by_port(&self, port: u16) -> Option<&ClientRecord<S>> {
        self.records.iter().find(|record| record.port() == port)
    }

    /// Remove and return the record for `port`, closing nothing until the
    /// caller drops it.
    pub fn remove_by_port(&mut self, port: u16) -> Option<ClientRecord<S>> {
        let index = self.records.iter().position(|record| record.port() == port)?;
        Some(self.records.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClientRecord<S>> {
        self.records.iter()
    }

    /// Take ownership of every record, leaving the table empty.
    pub fn drain(&mut self) -> Vec<ClientRecord<S>> {
        std::mem::take(&mut self.records)
    }

    /// Re-append survivors of a drain in their original relative order.
    pub fn concat(&mut self, survivors: Vec<ClientRecord<S>>) {
        self.records.extend(survivors);
    }
}

impl<S> Default for ClientTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
