use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod simulation;

/// Simulated oracle fleet and airline driver for the aerosure core.
///
/// Registers a fleet of oracles, bootstraps and funds a set of airlines,
/// opens a status request per flight, and lets the oracle workers race to
/// finalize each one.
#[derive(Parser)]
#[command(name = "aerosure-sim")]
struct Args {
    /// Number of oracles to register.
    #[arg(long, default_value = "20")]
    oracles: usize,

    /// Number of flights to open status requests for.
    #[arg(long, default_value = "3")]
    flights: usize,

    /// Number of airlines to bootstrap and fund.
    #[arg(long, default_value = "4")]
    airlines: usize,

    /// Optional TOML configuration file overriding protocol constants.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,aerosure_core=info,aerosure_sim=info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            aerosure_core::AppConfig::from_toml_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?
        }
        None => aerosure_core::AppConfig::default(),
    };

    simulation::run(config, args.oracles, args.airlines, args.flights).await
}
