//! Probe transmission sink trait.

use async_trait::async_trait;
use std::net::SocketAddrV4;
use topologer_core::TopologyError;

/// Trait for sending probe datagrams with a chosen TTL.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sends `payload` to `addr` with the IP TTL set to `ttl`.
    async fn send_to(
        &mut self,
        payload: &[u8],
        addr: SocketAddrV4,
        ttl: u8,
    ) -> Result<(), TopologyError>;

    /// The local port probes leave from.
    fn local_port(&self) -> u16;

    /// Closes the sink.
    async fn close(&mut self) -> Result<(), TopologyError>;
}
