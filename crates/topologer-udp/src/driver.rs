//! UDP probe engine implementation.

use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::time::Instant;
use topologer_core::{ProbeEngine, ProbeReply, TopologyError};
use topologer_packets::{parse_icmp_reply, Sink, Source, SourceSinkHandle};
use tracing::{trace, warn};

/// IP protocol number for UDP.
const IPPROTO_UDP: u8 = 17;

/// Largest packet read from the ICMP source.
const READ_BUFFER_SIZE: usize = 1500;

/// Data stored for the probe awaiting a reply.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    ttl: u8,
    port: u16,
    destination: Ipv4Addr,
    sent_at: Instant,
}

/// Sends empty UDP datagrams and matches the ICMP replies they provoke.
pub struct UdpProbeEngine {
    /// ICMP source for receiving.
    source: Box<dyn Source>,
    /// UDP sink for sending.
    sink: Box<dyn Sink>,
    /// Read buffer.
    buffer: Vec<u8>,
    in_flight: Option<InFlight>,
}

impl UdpProbeEngine {
    /// Creates a new engine over the given source and sink.
    pub fn new(source: Box<dyn Source>, sink: Box<dyn Sink>) -> Self {
        Self {
            source,
            sink,
            buffer: vec![0u8; READ_BUFFER_SIZE],
            in_flight: None,
        }
    }

    /// Creates an engine from a platform source/sink pair.
    pub fn from_handle(handle: SourceSinkHandle) -> Self {
        Self::new(handle.source, handle.sink)
    }

    /// Turns one received packet into a reply for `probe`.
    ///
    /// Every raw ICMP socket on the host sees every ICMP packet, so replies
    /// quoting another socket's datagram are rejected as mismatches. A reply
    /// that quotes nothing is accepted on its type alone.
    fn handle_packet(
        &self,
        n: usize,
        sender: Ipv4Addr,
        probe: &InFlight,
    ) -> Result<ProbeReply, TopologyError> {
        let reply = parse_icmp_reply(&self.buffer[..n])?;
        let kind = reply.kind()?;

        if let Some(quoted) = reply.quoted {
            if quoted.protocol != IPPROTO_UDP || quoted.destination != probe.destination {
                trace!(
                    expected = %probe.destination,
                    actual = %quoted.destination,
                    protocol = quoted.protocol,
                    "Ignored ICMP packet for another datagram"
                );
                return Err(TopologyError::PacketMismatch);
            }
            if let Some(udp) = quoted.udp {
                if udp.src_port != self.sink.local_port() || udp.dst_port != probe.port {
                    trace!(
                        expected_src = self.sink.local_port(),
                        expected_dst = probe.port,
                        actual_src = udp.src_port,
                        actual_dst = udp.dst_port,
                        "Ignored ICMP packet with different ports"
                    );
                    return Err(TopologyError::PacketMismatch);
                }
            }
        }

        Ok(ProbeReply {
            responder: sender,
            kind,
            rtt: probe.sent_at.elapsed(),
        })
    }
}

#[async_trait]
impl ProbeEngine for UdpProbeEngine {
    async fn send_probe(
        &mut self,
        destination: Ipv4Addr,
        port: u16,
        ttl: u8,
    ) -> Result<(), TopologyError> {
        let probe = InFlight {
            ttl,
            port,
            destination,
            sent_at: Instant::now(),
        };

        trace!(ttl = ttl, port = port, "Sending UDP probe");
        self.sink
            .send_to(&[], SocketAddrV4::new(destination, port), ttl)
            .await?;

        self.in_flight = Some(probe);
        Ok(())
    }

    async fn await_reply(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<ProbeReply>, TopologyError> {
        let probe = self
            .in_flight
            .take()
            .ok_or_else(|| TopologyError::Internal("no probe in flight".to_string()))?;

        self.source.set_read_deadline(Instant::now() + timeout);

        loop {
            let (n, sender) = match self.source.read(&mut self.buffer).await {
                Ok(received) => received,
                Err(TopologyError::ReadTimeout) => return Ok(None),
                Err(e) => {
                    // Ends this hop's wait only; the hop is recorded as unanswered.
                    warn!(ttl = probe.ttl, error = %e, "Receive failed, giving up on this hop");
                    return Ok(None);
                }
            };

            match self.handle_packet(n, sender, &probe) {
                Ok(reply) => return Ok(Some(reply)),
                Err(e) if e.is_retryable() => {
                    trace!(ttl = probe.ttl, sender = %sender, error = %e, "Skipping packet");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TopologyError> {
        let sink_result = self.sink.close().await;
        let source_result = self.source.close().await;

        sink_result?;
        source_result?;

        Ok(())
    }
}
