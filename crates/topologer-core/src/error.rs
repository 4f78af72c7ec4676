//! Error types for tracing and topology operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for network-topologer.
#[derive(Error, Debug)]
pub enum TopologyError {
    // Destination errors
    #[error("Failed to resolve destination '{destination}': {reason}")]
    NameResolution { destination: String, reason: String },

    // Socket errors
    #[error("Permission denied when creating raw socket: {0}")]
    PermissionDenied(#[source] std::io::Error),

    #[error("Failed to create socket: {0}")]
    SocketCreation(#[source] std::io::Error),

    #[error("Failed to send probe at ttl={ttl}: {source}")]
    ProbeSend {
        ttl: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive reply: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    #[error("Read timeout exceeded")]
    ReadTimeout,

    // Packet errors
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Ignoring ICMP message of type {0}")]
    UnexpectedIcmpType(u8),

    #[error("Packet did not match the in-flight probe")]
    PacketMismatch,

    // Configuration errors
    #[error("Invalid max hops: {0} (must be at least 1)")]
    InvalidMaxHops(u8),

    #[error("Probe ports overflow: base port {base_port} + max hops {max_hops} exceeds 65535")]
    InvalidPortRange { base_port: u16, max_hops: u8 },

    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TopologyError {
    /// Returns true if the receiver should keep waiting for another packet.
    ///
    /// A raw ICMP socket sees every control message reaching the host, so most
    /// of what it reads belongs to somebody else. Those packets are skipped and
    /// the remaining time window is spent waiting for the next one.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadTimeout
                | Self::PacketTooShort { .. }
                | Self::MalformedPacket(_)
                | Self::UnexpectedIcmpType(_)
                | Self::PacketMismatch
        )
    }

    /// Folds this error into the coarse category recorded in a result set.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NameResolution { .. } => FailureKind::NameResolution,
            Self::PermissionDenied(_) => FailureKind::PermissionDenied,
            Self::ProbeSend { .. } => FailureKind::ProbeSend,
            _ => FailureKind::Other,
        }
    }
}

impl From<std::io::Error> for TopologyError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                TopologyError::ReadTimeout
            }
            _ => TopologyError::ReceiveFailed(err),
        }
    }
}

/// Coarse classification of why a destination produced no hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NameResolution,
    PermissionDenied,
    ProbeSend,
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::NameResolution => write!(f, "name resolution"),
            FailureKind::PermissionDenied => write!(f, "permission denied"),
            FailureKind::ProbeSend => write!(f, "probe send"),
            FailureKind::Other => write!(f, "other"),
        }
    }
}

/// Result type alias for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;
