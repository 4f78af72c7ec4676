//! Result types for a batch of traces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::graph::{
    derive_adjacency, derive_edge_latency, edge_latency_summary, graph_stats, topology_dict,
    EdgeLatency, GraphStats,
};
use crate::{FailureKind, PathResult, PathTrace, TopologyError, TraceOutcome};

/// Why a destination has no hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFailure {
    /// Coarse category of the failure.
    pub kind: FailureKind,
    /// Human readable description.
    pub message: String,
}

impl From<&TopologyError> for TraceFailure {
    fn from(err: &TopologyError) -> Self {
        Self {
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

/// How the trace for a destination ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceStatus {
    Reached,
    MaxHopsExceeded,
    Failed(TraceFailure),
}

impl From<TraceOutcome> for TraceStatus {
    fn from(outcome: TraceOutcome) -> Self {
        match outcome {
            TraceOutcome::Reached => TraceStatus::Reached,
            TraceOutcome::MaxHopsExceeded => TraceStatus::MaxHopsExceeded,
        }
    }
}

/// Hops and status recorded for one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The hops discovered. Empty when the trace failed.
    pub hops: PathResult,
    /// How the trace ended.
    #[serde(flatten)]
    pub status: TraceStatus,
}

/// Mapping from destination (as given by the caller) to its traced path.
///
/// Every destination handed to an orchestration call has an entry, including
/// the ones that failed before sending a single probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: BTreeMap<String, TraceEntry>,
}

impl ResultSet {
    /// Creates an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of tracing `destination`.
    ///
    /// Errors are folded into an empty path with a `Failed` status.
    pub fn record(&mut self, destination: String, result: Result<PathTrace, TopologyError>) {
        let entry = match result {
            Ok(trace) => TraceEntry {
                hops: trace.hops,
                status: trace.outcome.into(),
            },
            Err(err) => TraceEntry {
                hops: PathResult::new(),
                status: TraceStatus::Failed(TraceFailure::from(&err)),
            },
        };
        self.entries.insert(destination, entry);
    }

    /// Records a failure that did not come from a trace (e.g. a lost worker).
    pub fn record_failure(&mut self, destination: String, failure: TraceFailure) {
        self.entries.insert(
            destination,
            TraceEntry {
                hops: PathResult::new(),
                status: TraceStatus::Failed(failure),
            },
        );
    }

    /// Returns the entry for `destination`.
    pub fn entry(&self, destination: &str) -> Option<&TraceEntry> {
        self.entries.get(destination)
    }

    /// Returns the hops for `destination`.
    pub fn path(&self, destination: &str) -> Option<&PathResult> {
        self.entries.get(destination).map(|e| &e.hops)
    }

    /// Iterates over all entries in destination order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &TraceEntry)> {
        self.entries.iter().map(|(d, e)| (d.as_str(), e))
    }

    /// Iterates over all paths in destination order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &PathResult)> {
        self.entries.iter().map(|(d, e)| (d.as_str(), &e.hops))
    }

    /// Iterates over the destinations that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TraceFailure)> {
        self.entries.iter().filter_map(|(d, e)| match &e.status {
            TraceStatus::Failed(f) => Some((d.as_str(), f)),
            _ => None,
        })
    }

    /// Returns true if any destination failed for lack of raw-socket privilege.
    pub fn permission_denied(&self) -> bool {
        self.failures()
            .any(|(_, f)| f.kind == FailureKind::PermissionDenied)
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.entries.contains_key(destination)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PathResult)> for ResultSet {
    fn from_iter<T: IntoIterator<Item = (String, PathResult)>>(iter: T) -> Self {
        let entries = iter
            .into_iter()
            .map(|(destination, hops)| {
                (
                    destination,
                    TraceEntry {
                        hops,
                        status: TraceStatus::Reached,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

/// Everything the tool knows after a batch, in one serialisable document.
#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    /// Per-destination hops and status.
    pub results: ResultSet,
    /// Address to sorted next-hop addresses.
    pub topology: BTreeMap<Ipv4Addr, Vec<Ipv4Addr>>,
    /// Latency samples per observed link.
    pub edge_latencies: Vec<EdgeLatency>,
    /// Graph statistics.
    pub stats: GraphStats,
}

impl TopologyReport {
    /// Derives the graphs from `results` and bundles them.
    pub fn from_results(results: &ResultSet) -> Self {
        let adjacency = derive_adjacency(results);
        let latencies = derive_edge_latency(results);
        Self {
            results: results.clone(),
            topology: topology_dict(&adjacency),
            edge_latencies: edge_latency_summary(&latencies),
            stats: graph_stats(&adjacency),
        }
    }

    /// Serializes the report to JSON with indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes the report to compact JSON.
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
