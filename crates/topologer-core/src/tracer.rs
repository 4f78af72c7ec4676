//! Tracing the path to a single destination.
//!
//! Sends one probe per TTL, starting at 1, and waits for its reply before
//! sending the next.

use std::net::Ipv4Addr;
use tracing::{debug, trace, warn};

use crate::{
    Hop, Network, PathResult, ProbeEngine, ReplyKind, TopologyError, TraceOutcome, TraceParams,
};

/// The hops discovered for one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTrace {
    /// The destination as given by the caller.
    pub destination: String,
    /// The address it resolved to.
    pub target: Ipv4Addr,
    /// Hops in TTL order.
    pub hops: PathResult,
    /// How the trace ended.
    pub outcome: TraceOutcome,
}

/// Drives a [`ProbeEngine`] across increasing TTLs for one destination.
pub struct PathTracer<'a, N: Network> {
    network: &'a N,
    params: &'a TraceParams,
}

impl<'a, N: Network> PathTracer<'a, N> {
    pub fn new(network: &'a N, params: &'a TraceParams) -> Self {
        Self { network, params }
    }

    /// Resolves `destination`, then probes until it is reached or `max_hops`
    /// is exhausted.
    ///
    /// The engine's sockets are released before this returns, whether the
    /// trace succeeded or not.
    pub async fn trace(&self, destination: &str) -> Result<PathTrace, TopologyError> {
        self.params.validate()?;

        let target = self.network.resolve(destination).await?;
        debug!(destination = %destination, target = %target, "Resolved destination");

        let mut engine = self.network.open(target).await?;
        let probed = self.probe_all(&mut engine, target).await;
        if let Err(e) = engine.close().await {
            warn!(destination = %destination, error = %e, "Failed to close probe engine");
        }
        let (hops, outcome) = probed?;

        debug!(
            destination = %destination,
            hops = hops.len(),
            outcome = ?outcome,
            "Trace finished"
        );

        Ok(PathTrace {
            destination: destination.to_string(),
            target,
            hops,
            outcome,
        })
    }

    async fn probe_all(
        &self,
        engine: &mut N::Engine,
        target: Ipv4Addr,
    ) -> Result<(PathResult, TraceOutcome), TopologyError> {
        let mut hops = PathResult::with_capacity(self.params.max_hops as usize);

        for ttl in 1..=self.params.max_hops {
            let port = self.params.probe_port(ttl)?;

            trace!(ttl = ttl, port = port, "Sending probe");
            engine.send_probe(target, port, ttl).await?;

            let reply = match engine.await_reply(self.params.timeout).await {
                Ok(reply) => reply,
                Err(TopologyError::ReceiveFailed(e)) => {
                    warn!(ttl = ttl, error = %e, "Receive failed, recording hop as unanswered");
                    None
                }
                Err(e) => return Err(e),
            };

            match reply {
                None => {
                    debug!(ttl = ttl, "Timeout waiting for response");
                    hops.push(Hop::unanswered(ttl));
                }
                Some(reply) => {
                    debug!(
                        ttl = ttl,
                        ip = %reply.responder,
                        rtt_ms = reply.elapsed_ms(),
                        kind = %reply.kind,
                        "Received probe response"
                    );
                    hops.push(Hop::answered(ttl, reply.responder, reply.elapsed_ms()));

                    if reply.responder == target || reply.kind == ReplyKind::DestinationUnreachable
                    {
                        debug!("Reached destination, stopping");
                        return Ok((hops, TraceOutcome::Reached));
                    }
                }
            }
        }

        debug!(max_hops = self.params.max_hops, "Max hops exceeded");
        Ok((hops, TraceOutcome::MaxHopsExceeded))
    }
}
