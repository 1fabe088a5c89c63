//! Bindery CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bindery::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tree(args) => bindery::cli::commands::tree::execute(args, cli.json).await,
        Commands::Check(args) => bindery::cli::commands::check::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        bindery::cli::handle_error(err, cli.json);
    }
}
