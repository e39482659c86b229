//! Producer/consumer demo over a blocking bounded queue.
//!
//! # Usage
//!
//! ```sh
//! bbq 100 250                     # producers sleep < 100 ms, consumers < 250 ms
//! bbq 10 10 --capacity 16 --iterations 1000 --seed 7
//! ```
//!
//! Without `--iterations` the workers run until the process is interrupted.
//! Log verbosity follows `RUST_LOG` (default `bbq=info`).

use std::time::Duration;

use bbq::harness::{DEFAULT_CAPACITY, DEFAULT_CONSUMERS, DEFAULT_PRODUCERS, Harness, HarnessConfig, HarnessError};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bbq", about = "Blocking bounded queue producer/consumer driver", version)]
struct Cli {
    /// Upper bound in milliseconds for the sleep between two inserts.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    producer_max_sleep_ms: u64,

    /// Upper bound in milliseconds for the sleep between two removes.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    consumer_max_sleep_ms: u64,

    /// Number of producer threads.
    #[arg(long, default_value_t = DEFAULT_PRODUCERS)]
    producers: usize,

    /// Number of consumer threads.
    #[arg(long, default_value_t = DEFAULT_CONSUMERS)]
    consumers: usize,

    /// Queue capacity.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Inserts per producer; runs forever when omitted.
    #[arg(long)]
    iterations: Option<u64>,

    /// Base seed for the per-thread random generators.
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Cli> for HarnessConfig {
    fn from(cli: Cli) -> Self {
        Self {
            producers: cli.producers,
            consumers: cli.consumers,
            capacity: cli.capacity,
            producer_max_delay: Duration::from_millis(cli.producer_max_sleep_ms),
            consumer_max_delay: Duration::from_millis(cli.consumer_max_sleep_ms),
            iterations: cli.iterations,
            seed: cli.seed,
        }
    }
}

fn main() {
    bbq::trace::init_tracing();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("bbq: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), HarnessError> {
    let harness = Harness::new(cli.into())?;
    let report = harness.run()?;
    eprintln!("bbq: produced {} item(s), consumed {} item(s)", report.produced, report.consumed);
    Ok(())
}
