//! Text rendering of results and topology.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::net::Ipv4Addr;
use topologer_core::{
    derive_adjacency, derive_edge_latency, edge_latency_summary, graph_stats, Hop, ResultSet,
    TraceStatus,
};

/// Renders each destination's hops, in the order the destinations were given.
pub fn render_results(results: &ResultSet, order: &[String]) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();

    for destination in order {
        if !seen.insert(destination.as_str()) {
            continue;
        }
        let Some(entry) = results.entry(destination) else {
            continue;
        };

        let _ = writeln!(out, "Destination: {}", destination);
        for hop in &entry.hops {
            let _ = writeln!(out, "{}", render_hop(hop));
        }
        if let TraceStatus::Failed(failure) = &entry.status {
            let _ = writeln!(out, "! {}", failure.message);
        }
        out.push('\n');
    }

    out
}

fn render_hop(hop: &Hop) -> String {
    match (hop.ip_address, hop.rtt) {
        (None, _) => format!("{}\t*", hop.ttl),
        (Some(ip), Some(rtt)) => format!("{}\t{}\t{:.1} ms", hop.ttl, ip, rtt),
        (Some(ip), None) => format!("{}\t{}\t?", hop.ttl, ip),
    }
}

/// Renders graph statistics and one line per link.
///
/// Returns `None` when the results contain no links at all.
pub fn render_topology(results: &ResultSet) -> Option<String> {
    let adjacency = derive_adjacency(results);
    if adjacency.is_empty() {
        return None;
    }

    let stats = graph_stats(&adjacency);
    let means: BTreeMap<(Ipv4Addr, Ipv4Addr), f64> =
        edge_latency_summary(&derive_edge_latency(results))
            .into_iter()
            .map(|edge| ((edge.source, edge.destination), edge.mean_ms))
            .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Topology stats: {} nodes, {} edges",
        stats.nodes, stats.edges
    );
    for (source, next_hops) in &adjacency {
        for destination in next_hops {
            match means.get(&(*source, *destination)) {
                Some(mean) => {
                    let _ = writeln!(out, "{} -> {}\t{:.1} ms", source, destination, mean);
                }
                None => {
                    let _ = writeln!(out, "{} -> {}", source, destination);
                }
            }
        }
    }

    Some(out)
}
