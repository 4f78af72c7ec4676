#![cfg(unix)]

//! Traces against the real network. Needs raw socket privileges, so these
//! run only when asked for: `cargo test -p topologer-udp -- --ignored`.

use std::time::Duration;
use topologer_core::{
    derive_adjacency, PathTracer, Topologer, TraceOutcome, TraceParams, TraceStatus,
};
use topologer_udp::SystemNetwork;

fn target() -> String {
    std::env::var("TOPOLOGER_TARGET").unwrap_or_else(|_| "8.8.8.8".to_string())
}

fn params() -> TraceParams {
    TraceParams {
        timeout: Duration::from_secs(1),
        max_hops: 20,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore]
async fn udp_trace_ipv4() {
    let network = SystemNetwork::new();
    let params = params();

    let trace = PathTracer::new(&network, &params)
        .trace(&target())
        .await
        .expect("udp trace");

    assert!(!trace.hops.is_empty());
    for (i, hop) in trace.hops.iter().enumerate() {
        assert_eq!(hop.ttl as usize, i + 1);
    }
    if trace.outcome == TraceOutcome::Reached {
        assert!(trace.hops.last().unwrap().is_answered());
    }
}

#[tokio::test]
#[ignore]
async fn concurrent_topology() {
    let topologer = Topologer::new(SystemNetwork::new(), params());
    let destinations = vec![target(), "1.1.1.1".to_string()];

    let results = topologer
        .run_concurrent(&destinations, None)
        .await
        .expect("concurrent run");

    assert_eq!(results.len(), 2);
    assert!(!results.permission_denied());
    let traced = results
        .entries()
        .filter(|(_, entry)| !matches!(entry.status, TraceStatus::Failed(_)))
        .count();
    assert!(traced > 0);
    assert!(!derive_adjacency(&results).is_empty());
}
