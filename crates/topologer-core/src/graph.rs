//! Graphs derived from a result set.
//!
//! Derivation never looks at TTLs, only at the order of answered hops: an
//! unanswered hop is skipped and its neighbours are linked directly.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use crate::ResultSet;

/// Address to the set of addresses seen immediately after it on some path.
pub type AdjacencyGraph = BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>>;

/// Directed link to the latency deltas sampled for it, in milliseconds.
pub type EdgeLatencyGraph = BTreeMap<(Ipv4Addr, Ipv4Addr), Vec<f64>>;

/// Basic statistics over an adjacency graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Distinct addresses appearing on either end of an edge.
    pub nodes: usize,
    /// Distinct directed edges.
    pub edges: usize,
    /// Addresses with at least one outgoing edge.
    pub sources: usize,
    /// Addresses with at least one incoming edge.
    pub destinations: usize,
}

/// Latency samples for one link, with their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeLatency {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub samples: Vec<f64>,
    pub mean_ms: f64,
}

/// Builds the adjacency graph from every path in `results`.
pub fn derive_adjacency(results: &ResultSet) -> AdjacencyGraph {
    let mut adjacency = AdjacencyGraph::new();

    for (_, hops) in results.paths() {
        let ips: Vec<Ipv4Addr> = hops.iter().filter_map(|h| h.ip_address).collect();
        for pair in ips.windows(2) {
            adjacency.entry(pair[0]).or_default().insert(pair[1]);
        }
    }

    adjacency
}

/// Builds per-link latency samples from every path in `results`.
///
/// The sample for a link is the RTT of the later hop minus the RTT of the
/// earlier one. Only positive deltas are kept; hops missing either an address
/// or an RTT are skipped.
pub fn derive_edge_latency(results: &ResultSet) -> EdgeLatencyGraph {
    let mut edges = EdgeLatencyGraph::new();

    for (_, hops) in results.paths() {
        let timed: Vec<(Ipv4Addr, f64)> = hops
            .iter()
            .filter_map(|h| Some((h.ip_address?, h.rtt?)))
            .collect();

        for pair in timed.windows(2) {
            let (src_ip, src_rtt) = pair[0];
            let (dst_ip, dst_rtt) = pair[1];
            let delta_ms = dst_rtt - src_rtt;
            if delta_ms > 0.0 {
                edges.entry((src_ip, dst_ip)).or_default().push(delta_ms);
            }
        }
    }

    edges
}

/// Counts nodes, edges, sources and destinations of `adjacency`.
pub fn graph_stats(adjacency: &AdjacencyGraph) -> GraphStats {
    let targets: BTreeSet<Ipv4Addr> = adjacency.values().flatten().copied().collect();
    let nodes = adjacency
        .iter()
        .filter(|(_, next)| !next.is_empty())
        .map(|(src, _)| *src)
        .chain(targets.iter().copied())
        .collect::<BTreeSet<_>>()
        .len();

    GraphStats {
        nodes,
        edges: adjacency.values().map(BTreeSet::len).sum(),
        sources: adjacency.len(),
        destinations: targets.len(),
    }
}

/// Returns the adjacency graph with sorted lists, ready for JSON.
pub fn topology_dict(adjacency: &AdjacencyGraph) -> BTreeMap<Ipv4Addr, Vec<Ipv4Addr>> {
    adjacency
        .iter()
        .map(|(src, next)| (*src, next.iter().copied().collect()))
        .collect()
}

/// Flattens `edges` into a list with the mean latency of each link.
pub fn edge_latency_summary(edges: &EdgeLatencyGraph) -> Vec<EdgeLatency> {
    edges
        .iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(&(source, destination), samples)| EdgeLatency {
            source,
            destination,
            samples: samples.clone(),
            mean_ms: samples.iter().sum::<f64>() / samples.len() as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hop, PathResult};

    const A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const B: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 1);
    const C: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 1);
    const D: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

    fn single(hops: PathResult) -> ResultSet {
        [("example.com".to_string(), hops)].into_iter().collect()
    }

    fn set(items: &[(Ipv4Addr, &[Ipv4Addr])]) -> AdjacencyGraph {
        items
            .iter()
            .map(|(src, next)| (*src, next.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_adjacency_linear_path() {
        let results = single(vec![
            Hop::answered(1, A, 10.0),
            Hop::answered(2, B, 20.0),
            Hop::answered(3, D, 30.0),
        ]);

        assert_eq!(derive_adjacency(&results), set(&[(A, &[B]), (B, &[D])]));
    }

    #[test]
    fn test_edge_latency_linear_path() {
        let results = single(vec![
            Hop::answered(1, A, 10.0),
            Hop::answered(2, B, 20.0),
            Hop::answered(3, D, 30.0),
        ]);

        let edges = derive_edge_latency(&results);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[&(A, B)], vec![10.0]);
        assert_eq!(edges[&(B, D)], vec![10.0]);
    }

    #[test]
    fn test_unanswered_hop_is_bridged() {
        let results = single(vec![
            Hop::answered(1, A, 5.0),
            Hop::unanswered(2),
            Hop::answered(3, D, 9.0),
        ]);

        assert_eq!(derive_adjacency(&results), set(&[(A, &[D])]));
        assert_eq!(derive_edge_latency(&results)[&(A, D)], vec![4.0]);
    }

    #[test]
    fn test_non_positive_deltas_are_dropped() {
        let results = single(vec![
            Hop::answered(1, A, 12.0),
            Hop::answered(2, B, 12.0),
            Hop::answered(3, C, 7.0),
            Hop::answered(4, D, 9.5),
        ]);

        let edges = derive_edge_latency(&results);
        assert!(!edges.contains_key(&(A, B)));
        assert!(!edges.contains_key(&(B, C)));
        assert_eq!(edges[&(C, D)], vec![2.5]);

        // Adjacency is unaffected by latency.
        assert_eq!(derive_adjacency(&results).len(), 3);
    }

    #[test]
    fn test_hop_without_rtt_is_skipped_for_latency_only() {
        let results = single(vec![
            Hop::answered(1, A, 1.0),
            Hop {
                ttl: 2,
                ip_address: Some(B),
                rtt: None,
            },
            Hop::answered(3, D, 4.0),
        ]);

        assert_eq!(derive_adjacency(&results), set(&[(A, &[B]), (B, &[D])]));
        let edges = derive_edge_latency(&results);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[&(A, D)], vec![3.0]);
    }

    #[test]
    fn test_shared_links_accumulate_samples_and_dedupe_edges() {
        let results: ResultSet = [
            (
                "one.example".to_string(),
                vec![Hop::answered(1, A, 1.0), Hop::answered(2, B, 3.0)],
            ),
            (
                "two.example".to_string(),
                vec![
                    Hop::answered(1, A, 2.0),
                    Hop::answered(2, B, 6.0),
                    Hop::answered(3, C, 7.0),
                ],
            ),
        ]
        .into_iter()
        .collect();

        let adjacency = derive_adjacency(&results);
        assert_eq!(adjacency, set(&[(A, &[B]), (B, &[C])]));

        let edges = derive_edge_latency(&results);
        assert_eq!(edges[&(A, B)], vec![2.0, 4.0]);

        let summary = edge_latency_summary(&edges);
        let ab = summary.iter().find(|e| e.source == A).unwrap();
        assert_eq!(ab.mean_ms, 3.0);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let results = single(vec![
            Hop::answered(1, A, 1.0),
            Hop::unanswered(2),
            Hop::answered(3, D, 2.0),
        ]);
        let before = results.clone();

        let first = derive_adjacency(&results);
        let second = derive_adjacency(&results);
        assert_eq!(first, second);
        assert_eq!(results, before);
    }

    #[test]
    fn test_empty_and_single_hop_paths_have_no_edges() {
        let results: ResultSet = [
            ("failed.example".to_string(), Vec::new()),
            ("one-hop.example".to_string(), vec![Hop::answered(1, D, 0.4)]),
        ]
        .into_iter()
        .collect();

        assert!(derive_adjacency(&results).is_empty());
        assert!(derive_edge_latency(&results).is_empty());
        assert_eq!(graph_stats(&derive_adjacency(&results)), GraphStats::default());
    }

    #[test]
    fn test_graph_stats() {
        let adjacency = set(&[(A, &[B, C]), (B, &[D]), (C, &[D])]);
        let stats = graph_stats(&adjacency);
        assert_eq!(
            stats,
            GraphStats {
                nodes: 4,
                edges: 4,
                sources: 3,
                destinations: 3,
            }
        );
    }

    #[test]
    fn test_topology_dict_is_sorted() {
        let adjacency = set(&[(A, &[C, B])]);
        let dict = topology_dict(&adjacency);
        assert_eq!(dict[&A], vec![B, C]);
    }
}
