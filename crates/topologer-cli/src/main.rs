//! CLI for network-topologer.

mod output;
mod random;
mod runner;

use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::time::Duration;
use topologer_core::{TopologyReport, TraceParams};
use tracing_subscriber::EnvFilter;

/// Network Topologer - discover paths and the links between them.
#[derive(Parser, Debug)]
#[command(name = "network-topologer")]
#[command(version)]
#[command(about = "Network Topologer - traceroute many destinations and map the links between them")]
pub struct Args {
    /// One or more IPv4 addresses or hostnames to trace.
    pub destinations: Vec<String>,

    /// Generate COUNT random public IP addresses to trace.
    #[arg(short, long, value_name = "COUNT")]
    pub random: Option<usize>,

    /// Seed for --random, for reproducible destination lists.
    #[arg(long, requires = "random")]
    pub seed: Option<u64>,

    /// Base destination UDP port; the probe at TTL n goes to port + n.
    #[arg(short, long, default_value_t = topologer_core::DEFAULT_BASE_PORT)]
    pub port: u16,

    /// Timeout for each probe in seconds.
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Maximum TTL before giving up on a destination.
    #[arg(short = 'm', long = "max-hops", default_value_t = topologer_core::DEFAULT_MAX_HOPS)]
    pub max_hops: u8,

    /// Trace destinations concurrently.
    #[arg(long)]
    pub parallel: bool,

    /// Maximum concurrent traces with --parallel (default: min(destinations, 32)).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Print the derived topology after the hops.
    #[arg(long)]
    pub topology: bool,

    /// Print a JSON report instead of text.
    #[arg(long)]
    pub json: bool,

    /// Print the JSON report on a single line.
    #[arg(long, requires = "json")]
    pub compact: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Convert CLI args to TraceParams.
    fn to_params(&self) -> TraceParams {
        TraceParams {
            base_port: self.port,
            timeout: Duration::from_secs(self.timeout),
            max_hops: self.max_hops,
        }
    }

    /// The destinations to trace: generated ones take precedence.
    fn destinations(&self) -> Result<Vec<String>, String> {
        match self.random {
            Some(0) => Err("--random COUNT must be a positive integer.".to_string()),
            Some(count) => Ok(random::generate_public_ips(count, self.seed)),
            None if self.destinations.is_empty() => Err(
                "Either provide destination IPs or use --random to generate them.".to_string(),
            ),
            None => Ok(self.destinations.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let destinations = match args.destinations() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            if args.random.is_none() {
                let _ = Args::command().print_help();
            }
            return ExitCode::FAILURE;
        }
    };

    if !args.json {
        if args.random.is_some() {
            println!(
                "Generated {} random public IP(s): [{}]",
                destinations.len(),
                destinations.join(", ")
            );
        }
        println!(
            "Traceroute to [{}] (timeout: {} seconds):",
            destinations.join(", "),
            args.timeout
        );
    }

    tracing::info!(
        destinations = destinations.len(),
        port = args.port,
        max_hops = args.max_hops,
        parallel = args.parallel,
        "Starting network-topologer"
    );

    let results = match runner::run_traces(&args, &destinations).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        let report = TopologyReport::from_results(&results);
        let json = if args.compact {
            report.to_json_compact()
        } else {
            report.to_json()
        };
        match json {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize results: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", output::render_results(&results, &destinations));
        if args.topology {
            match output::render_topology(&results) {
                Some(topology) => print!("{}", topology),
                None => eprintln!(
                    "Warning: No topology edges to show (all hops timed out or single-hop paths)."
                ),
            }
        }
    }

    if results.permission_denied() {
        eprintln!(
            "Error: raw socket access was denied; run as root or grant CAP_NET_RAW to receive ICMP replies."
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
