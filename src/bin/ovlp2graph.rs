use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use strandgraph::cli::Args;
use strandgraph::config::GraphConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = GraphConfig::from(&args);

    if let Err(err) = strandgraph::run_pipeline(&cfg) {
        let err: anyhow::Error = err.into();
        error!("{err}");
        std::process::exit(1);
    }
}
