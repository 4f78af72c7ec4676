//! Access to the host's resolver and sockets.

use crate::UdpProbeEngine;
use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::{IpAddr, Ipv4Addr};
use topologer_core::{Network, TopologyError};
use topologer_packets::new_source_sink;
use tracing::{debug, warn};

/// The real network: system DNS, a raw ICMP socket and a UDP socket per trace.
pub struct SystemNetwork {
    resolver: TokioResolver,
}

impl SystemNetwork {
    /// Creates a network using the system resolver configuration.
    ///
    /// Falls back to the built-in resolver configuration when the system
    /// one cannot be read.
    pub fn new() -> Self {
        let resolver = match TokioResolver::builder_tokio() {
            Ok(builder) => builder.build(),
            Err(e) => {
                warn!(error = %e, "Failed to read system resolver configuration, using defaults");
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .build()
            }
        };
        Self { resolver }
    }
}

impl Default for SystemNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Network for SystemNetwork {
    type Engine = UdpProbeEngine;

    async fn resolve(&self, destination: &str) -> Result<Ipv4Addr, TopologyError> {
        // First check if it's already an IP address
        match destination.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => return Ok(ip),
            Ok(IpAddr::V6(_)) => {
                return Err(TopologyError::NameResolution {
                    destination: destination.to_string(),
                    reason: "IPv6 destinations are not supported".to_string(),
                })
            }
            Err(_) => {}
        }

        let lookup = self
            .resolver
            .lookup_ip(destination)
            .await
            .map_err(|e| TopologyError::NameResolution {
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;

        let target = lookup.iter().find_map(|ip| match ip {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        });
        debug!(destination = %destination, target = ?target, "Looked up destination");

        target.ok_or_else(|| TopologyError::NameResolution {
            destination: destination.to_string(),
            reason: "no IPv4 address found".to_string(),
        })
    }

    async fn open(&self, target: Ipv4Addr) -> Result<UdpProbeEngine, TopologyError> {
        debug!(target = %target, "Opening probe sockets");
        let handle = new_source_sink().await?;
        Ok(UdpProbeEngine::from_handle(handle))
    }
}
