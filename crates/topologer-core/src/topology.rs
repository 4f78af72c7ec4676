//! Running traces for a batch of destinations.
//!
//! Provides sequential and concurrent execution. Both fold per-destination
//! failures into the result set instead of aborting the batch.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::graph::{derive_adjacency, derive_edge_latency, AdjacencyGraph, EdgeLatencyGraph};
use crate::{
    default_workers, FailureKind, Network, PathTracer, ResultSet, TopologyError, TraceFailure,
    TraceParams,
};

/// Runs many traces and aggregates them into a topology.
pub struct Topologer<N: Network> {
    network: Arc<N>,
    params: TraceParams,
}

impl<N: Network> Topologer<N> {
    pub fn new(network: N, params: TraceParams) -> Self {
        Self {
            network: Arc::new(network),
            params,
        }
    }

    /// Returns the network traces are run against.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Traces each destination in order, one at a time.
    pub async fn run_sequential(&self, destinations: &[String]) -> ResultSet {
        let destinations = unique(destinations);
        info!(count = destinations.len(), "Starting sequential traces");

        let tracer = PathTracer::new(self.network.as_ref(), &self.params);
        let mut results = ResultSet::new();
        for destination in destinations {
            let outcome = tracer.trace(&destination).await;
            if let Err(e) = &outcome {
                warn!(destination = %destination, error = %e, "Traceroute failed");
            }
            results.record(destination, outcome);
        }

        info!(count = results.len(), "Finished sequential traces");
        results
    }

    /// Traces destinations concurrently, at most `max_workers` at a time.
    ///
    /// `None` uses [`default_workers`]. Each task owns its own tracer and
    /// sockets; only the finished results are gathered here.
    pub async fn run_concurrent(
        &self,
        destinations: &[String],
        max_workers: Option<usize>,
    ) -> Result<ResultSet, TopologyError> {
        let destinations = unique(destinations);
        let workers = match max_workers {
            Some(0) => return Err(TopologyError::InvalidWorkerCount),
            Some(n) => n,
            None => default_workers(destinations.len()),
        };
        info!(
            count = destinations.len(),
            workers = workers,
            "Starting concurrent traces"
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for destination in destinations.iter().cloned() {
            let network = Arc::clone(&self.network);
            let params = self.params.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let err = TopologyError::Internal("worker pool closed".to_string());
                        return (destination, Err(err));
                    }
                };
                debug!(destination = %destination, "Worker picked up destination");
                let outcome = PathTracer::new(network.as_ref(), &params)
                    .trace(&destination)
                    .await;
                (destination, outcome)
            });
        }

        let mut results = ResultSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((destination, outcome)) => {
                    if let Err(e) = &outcome {
                        warn!(destination = %destination, error = %e, "Traceroute failed");
                    }
                    results.record(destination, outcome);
                }
                Err(e) => warn!(error = %e, "Trace task did not complete"),
            }
        }

        // A panicked task cannot report its destination; keep the key anyway.
        for destination in destinations {
            if !results.contains(&destination) {
                results.record_failure(
                    destination,
                    TraceFailure {
                        kind: FailureKind::Other,
                        message: "trace task did not complete".to_string(),
                    },
                );
            }
        }

        info!(count = results.len(), "Finished concurrent traces");
        Ok(results)
    }

    /// Builds the adjacency graph for `results`.
    pub fn derive_adjacency(&self, results: &ResultSet) -> AdjacencyGraph {
        derive_adjacency(results)
    }

    /// Builds the per-link latency samples for `results`.
    pub fn derive_edge_latency(&self, results: &ResultSet) -> EdgeLatencyGraph {
        derive_edge_latency(results)
    }
}

/// Drops repeated destinations, keeping the first occurrence.
fn unique(destinations: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    destinations
        .iter()
        .filter(|d| seen.insert(d.as_str()))
        .cloned()
        .collect()
}
