//! Inbound ICMP source trait.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tokio::time::Instant;
use topologer_core::TopologyError;

/// Trait for sources of inbound ICMP packets.
#[async_trait]
pub trait Source: Send + Sync {
    /// Sets the read deadline for subsequent read operations.
    fn set_read_deadline(&mut self, deadline: Instant);

    /// Reads a packet (starting at the IPv4 header) into the buffer.
    ///
    /// Returns the number of bytes read and the sender's address, or
    /// [`TopologyError::ReadTimeout`] once the deadline has passed.
    async fn read(&mut self, buf: &mut [u8]) -> Result<(usize, Ipv4Addr), TopologyError>;

    /// Closes the source.
    async fn close(&mut self) -> Result<(), TopologyError>;
}
