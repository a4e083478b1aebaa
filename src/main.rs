use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use callgate::{LimiterConfig, Outcome, RateLimiter};

/// Call a rate-limited operation on a fixed schedule and report each outcome.
#[derive(Debug, Parser)]
#[command(name = "callgate", version, about)]
struct Args {
    /// YAML configuration file (CALLGATE_* environment variables override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum admitted calls per window
    #[arg(long)]
    max_calls: Option<u32>,

    /// Sliding window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Number of calls to attempt
    #[arg(long, default_value_t = 5)]
    calls: u32,

    /// Pause between calls in milliseconds
    #[arg(long, default_value_t = 750)]
    interval_ms: u64,

    /// Identity to count calls under (defaults to the operation's name)
    #[arg(long)]
    name: Option<String>,

    /// Argument handed to the operation
    #[arg(default_value = "worthy")]
    input: String,
}

fn print_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let mut config = LimiterConfig::load(args.config.as_deref())?;
    if let Some(max_calls) = args.max_calls {
        config.max_calls = max_calls;
    }
    if let Some(window_ms) = args.window_ms {
        config = config.with_window(Duration::from_millis(window_ms));
    }

    let limiter = Arc::new(RateLimiter::from_config(&config)?);
    info!(
        max_calls = limiter.max_calls(),
        window = ?limiter.window(),
        policy = ?limiter.rejection_policy(),
        "Rate limiter initialized"
    );

    let operation = match args.name {
        Some(name) => limiter.wrap_named(print_name, name),
        None => limiter.wrap(print_name),
    };

    let interval = Duration::from_millis(args.interval_ms);
    for attempt in 1..=args.calls {
        match operation.call(args.input.as_str()) {
            Outcome::Admitted(output) => info!(attempt, identity = %operation.identity(), "{}", output),
            Outcome::Rejected(rejection) => warn!(
                attempt,
                count = rejection.call_count,
                retry_after = ?rejection.retry_after,
                "{}",
                rejection
            ),
        }
        tokio::time::sleep(interval).await;
    }

    Ok(())
}
