//! Core types for tracing operations.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::TopologyError;

/// Default base UDP port; probe ports are `base + ttl`.
pub const DEFAULT_BASE_PORT: u16 = 33434;
/// Default time to wait for a reply to each probe.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default hop-limit cap, matching conventional traceroute tools.
pub const DEFAULT_MAX_HOPS: u8 = 30;
/// Upper bound on the default number of concurrent traces.
pub const MAX_DEFAULT_WORKERS: usize = 32;

/// ICMP type for "time exceeded".
pub const ICMP_TIME_EXCEEDED: u8 = 11;
/// ICMP type for "destination unreachable".
pub const ICMP_DEST_UNREACHABLE: u8 = 3;

/// A single hop in a traced path.
///
/// `ip_address` and `rtt` are both absent when the probe sent with this TTL
/// went unanswered within the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    /// The TTL used for this probe, starting at 1.
    pub ttl: u8,
    /// The address that answered, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<Ipv4Addr>,
    /// Round-trip time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt: Option<f64>,
}

impl Hop {
    /// A hop that was answered by `ip` after `rtt_ms` milliseconds.
    pub fn answered(ttl: u8, ip: Ipv4Addr, rtt_ms: f64) -> Self {
        Self {
            ttl,
            ip_address: Some(ip),
            rtt: Some(rtt_ms),
        }
    }

    /// A hop whose probe timed out.
    pub fn unanswered(ttl: u8) -> Self {
        Self {
            ttl,
            ip_address: None,
            rtt: None,
        }
    }

    /// Returns true if a router or the destination answered this probe.
    pub fn is_answered(&self) -> bool {
        self.ip_address.is_some()
    }
}

/// Ordered hops for one destination, TTLs `1..=N` without gaps.
pub type PathResult = Vec<Hop>;

/// Classification of an inbound control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// ICMP type 11, sent by an intermediate router.
    HopLimitExceeded,
    /// ICMP type 3, sent by the destination when the probe port is closed.
    DestinationUnreachable,
    /// Any other control message an engine chose to surface.
    Other(u8),
}

impl ReplyKind {
    /// Maps an ICMP type onto a reply kind.
    pub fn from_icmp_type(icmp_type: u8) -> Self {
        match icmp_type {
            ICMP_TIME_EXCEEDED => ReplyKind::HopLimitExceeded,
            ICMP_DEST_UNREACHABLE => ReplyKind::DestinationUnreachable,
            other => ReplyKind::Other(other),
        }
    }
}

impl std::fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyKind::HopLimitExceeded => write!(f, "hop_limit_exceeded"),
            ReplyKind::DestinationUnreachable => write!(f, "destination_unreachable"),
            ReplyKind::Other(t) => write!(f, "other({})", t),
        }
    }
}

/// Reply to a single probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReply {
    /// The address that sent the control message.
    pub responder: Ipv4Addr,
    /// What kind of control message it was.
    pub kind: ReplyKind,
    /// Time from sending the probe to receiving the reply.
    pub rtt: Duration,
}

impl ProbeReply {
    /// Round-trip time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.rtt.as_secs_f64() * 1000.0
    }
}

/// How a trace that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The destination answered, or a destination-unreachable was received.
    Reached,
    /// `max_hops` probes were sent without reaching the destination.
    MaxHopsExceeded,
}

/// Parameters shared by every trace in a batch.
#[derive(Debug, Clone)]
pub struct TraceParams {
    /// Base UDP port; the probe for TTL `n` goes to `base_port + n`.
    pub base_port: u16,
    /// Timeout for each probe.
    pub timeout: Duration,
    /// Maximum TTL to probe before giving up.
    pub max_hops: u8,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            timeout: DEFAULT_TIMEOUT,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl TraceParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.max_hops == 0 {
            return Err(TopologyError::InvalidMaxHops(self.max_hops));
        }
        if self.base_port.checked_add(self.max_hops as u16).is_none() {
            return Err(TopologyError::InvalidPortRange {
                base_port: self.base_port,
                max_hops: self.max_hops,
            });
        }
        Ok(())
    }

    /// Destination port for the probe sent with `ttl`.
    pub fn probe_port(&self, ttl: u8) -> Result<u16, TopologyError> {
        self.base_port
            .checked_add(ttl as u16)
            .ok_or(TopologyError::InvalidPortRange {
                base_port: self.base_port,
                max_hops: ttl,
            })
    }
}

/// Default worker count for `count` destinations.
pub fn default_workers(count: usize) -> usize {
    count.clamp(1, MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_params_validate() {
        assert!(TraceParams::default().validate().is_ok());

        let no_hops = TraceParams {
            max_hops: 0,
            ..Default::default()
        };
        assert!(matches!(
            no_hops.validate(),
            Err(TopologyError::InvalidMaxHops(0))
        ));

        let overflow = TraceParams {
            base_port: 65_500,
            max_hops: 64,
            ..Default::default()
        };
        assert!(matches!(
            overflow.validate(),
            Err(TopologyError::InvalidPortRange { .. })
        ));

        let edge = TraceParams {
            base_port: 65_535 - 30,
            max_hops: 30,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_probe_port() {
        let params = TraceParams::default();
        assert_eq!(params.probe_port(1).unwrap(), 33435);
        assert_eq!(params.probe_port(30).unwrap(), 33464);
    }

    #[test]
    fn test_reply_kind_from_icmp_type() {
        assert_eq!(ReplyKind::from_icmp_type(11), ReplyKind::HopLimitExceeded);
        assert_eq!(
            ReplyKind::from_icmp_type(3),
            ReplyKind::DestinationUnreachable
        );
        assert_eq!(ReplyKind::from_icmp_type(0), ReplyKind::Other(0));
    }

    #[test]
    fn test_default_workers() {
        assert_eq!(default_workers(0), 1);
        assert_eq!(default_workers(5), 5);
        assert_eq!(default_workers(100), MAX_DEFAULT_WORKERS);
    }

    #[test]
    fn test_hop_serialization_skips_absent_fields() {
        let json = serde_json::to_string(&Hop::unanswered(2)).unwrap();
        assert_eq!(json, r#"{"ttl":2}"#);

        let hop = Hop::answered(1, Ipv4Addr::new(10, 0, 0, 1), 1.5);
        let json = serde_json::to_string(&hop).unwrap();
        assert!(json.contains(r#""ip_address":"10.0.0.1""#));
        assert!(json.contains(r#""rtt":1.5"#));
    }
}
