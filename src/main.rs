use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use printshop::{Config, Coordinator, Policy, DEFAULT_CAPACITY};

/// Simulates a print shop: producers submit print jobs to a bounded queue, consumers serve them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of producer threads
    producers: usize,

    /// Number of consumer threads
    consumers: usize,

    /// Maximum number of pending jobs
    #[arg(short = 'c', long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Order in which consumers take jobs
    #[arg(short = 'p', long, value_enum, default_value_t = Policy::Fcfs)]
    policy: Policy,

    /// Service time of one unit of job size, in milliseconds
    #[arg(long, default_value_t = 10)]
    service_unit_ms: u64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// CPU IDs to pin worker threads to, round-robin
    #[arg(long, value_delimiter = ',')]
    pin_cores: Vec<usize>,

    /// Log every produced and consumed job
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::new(args.producers, args.consumers)
        .capacity(args.capacity)
        .policy(args.policy)
        .service_unit(Duration::from_millis(args.service_unit_ms))
        .cores(args.pin_cores)
        .graceful_shutdown(true);
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }

    let coordinator = Coordinator::new(config).context("failed to set the run up")?;
    let report = coordinator.run().context("run aborted")?;

    println!("{report}");
    if !report.cancelled && !report.is_balanced() {
        anyhow::bail!("produced and consumed jobs don't match");
    }

    Ok(())
}
