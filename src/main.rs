use clap::Parser;
use scout::cli::{Cli, Commands, serve, show_config};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr only; stdout belongs to the MCP channel.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Some(Commands::Config) => show_config(&cli),
        Some(Commands::Serve) | None => serve(&cli).await,
    }
}
