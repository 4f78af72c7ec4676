//! Seams between the tracing logic and the network.

use crate::{ProbeReply, TopologyError};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// One request/response exchange at a given TTL.
///
/// An engine owns the sockets for a single trace. It is created by
/// [`Network::open`] and must be closed by the caller on every exit path.
#[async_trait]
pub trait ProbeEngine: Send {
    /// Sends one probe to `destination:port` with the IP TTL set to `ttl`.
    ///
    /// Fails with [`TopologyError::ProbeSend`] when the OS rejects the send.
    async fn send_probe(
        &mut self,
        destination: Ipv4Addr,
        port: u16,
        ttl: u8,
    ) -> Result<(), TopologyError>;

    /// Waits up to `timeout` for a reply to the last probe.
    ///
    /// Returns `Ok(None)` if nothing relevant arrived in time or the receive
    /// itself failed. Irrelevant or unparseable packets do not end the wait
    /// early.
    async fn await_reply(&mut self, timeout: Duration)
        -> Result<Option<ProbeReply>, TopologyError>;

    /// Closes the engine, releasing its sockets.
    async fn close(&mut self) -> Result<(), TopologyError>;
}

/// Access to name resolution and socket acquisition.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    /// The engine type produced by [`Network::open`].
    type Engine: ProbeEngine + 'static;

    /// Resolves a hostname or literal address to an IPv4 address.
    async fn resolve(&self, destination: &str) -> Result<Ipv4Addr, TopologyError>;

    /// Acquires the listening and sending sockets for a trace to `target`.
    ///
    /// Fails with [`TopologyError::PermissionDenied`] if the raw listener
    /// cannot be created.
    async fn open(&self, target: Ipv4Addr) -> Result<Self::Engine, TopologyError>;
}
