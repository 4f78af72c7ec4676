//! Runs a batch of traces against the host network.

use crate::Args;
use topologer_core::{ResultSet, Topologer, TopologyError};
use topologer_udp::SystemNetwork;

/// Traces every destination with the parameters given on the command line.
pub async fn run_traces(args: &Args, destinations: &[String]) -> Result<ResultSet, TopologyError> {
    let params = args.to_params();
    params.validate()?;

    let topologer = Topologer::new(SystemNetwork::new(), params);
    if args.parallel {
        topologer.run_concurrent(destinations, args.workers).await
    } else {
        Ok(topologer.run_sequential(destinations).await)
    }
}
