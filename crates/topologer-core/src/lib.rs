//! Core types, tracing logic and topology aggregation for network-topologer.
//!
//! This crate provides the fundamental abstractions used throughout the
//! workspace:
//!
//! - [`ProbeEngine`] and [`Network`] traits at the socket boundary
//! - [`PathTracer`] for one destination and [`Topologer`] for a batch
//! - [`ResultSet`] and the graphs derived from it
//! - [`TopologyError`] for error handling

pub mod error;
pub mod graph;
pub mod result;
pub mod topology;
pub mod tracer;
pub mod traits;
pub mod types;

#[cfg(test)]
mod sim;

pub use error::{FailureKind, TopologyError, TopologyResult};
pub use graph::{
    derive_adjacency, derive_edge_latency, edge_latency_summary, graph_stats, topology_dict,
    AdjacencyGraph, EdgeLatency, EdgeLatencyGraph, GraphStats,
};
pub use result::{ResultSet, TopologyReport, TraceEntry, TraceFailure, TraceStatus};
pub use topology::Topologer;
pub use tracer::{PathTrace, PathTracer};
pub use traits::{Network, ProbeEngine};
pub use types::{
    default_workers, Hop, PathResult, ProbeReply, ReplyKind, TraceOutcome, TraceParams,
    DEFAULT_BASE_PORT, DEFAULT_MAX_HOPS, DEFAULT_TIMEOUT, ICMP_DEST_UNREACHABLE,
    ICMP_TIME_EXCEEDED, MAX_DEFAULT_WORKERS,
};
