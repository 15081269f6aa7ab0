//! Command-line front-end.

use crate::approval::TerminalPrompter;
use crate::config::Config;
use crate::server::{Server, transport};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// scout - secure filesystem MCP server with human-in-the-loop approval
#[derive(Parser, Debug)]
#[command(name = "scout", version, about)]
pub struct Cli {
    /// Config file (default: ~/.config/scout/scout.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout (the default)
    Serve,
    /// Validate and print the configuration
    Config,
}

fn load_config(cli_path: Option<&PathBuf>) -> anyhow::Result<(Config, PathBuf, bool)> {
    let (path, explicit) = match cli_path {
        Some(path) => (path.clone(), true),
        None => (Config::default_path(), false),
    };
    let config = Config::load(&path, explicit)?;
    Ok((config, path, explicit))
}

/// Run the stdio server until the client hangs up.
pub async fn serve(cli: &Cli) -> ExitCode {
    let (config, path, explicit) = match load_config(cli.config.as_ref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Error loading config: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let server = Arc::new(Server::new(
        config,
        path,
        explicit,
        Arc::new(TerminalPrompter),
    ));

    // SIGINT turns a pending approval prompt into a cancelled call; it does
    // not kill the server.
    {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                tracing::info!("interrupt received");
                server.interrupt();
            }
        });
    }

    // SIGHUP swaps in a freshly loaded config; sessions survive.
    #[cfg(unix)]
    {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let Ok(mut hangups) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
            else {
                return;
            };
            while hangups.recv().await.is_some() {
                if let Err(err) = server.reload_config().await {
                    tracing::error!(%err, "config reload failed");
                }
            }
        });
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "scout serving on stdio");
    match transport::serve(&server, tokio::io::stdin(), tokio::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "transport failed");
            ExitCode::FAILURE
        }
    }
}

/// Print the validated configuration as JSON.
pub fn show_config(cli: &Cli) -> ExitCode {
    match load_config(cli.config.as_ref()) {
        Ok((config, path, _)) => {
            let map = config.to_map();
            println!(
                "{}",
                serde_json::to_string_pretty(&map).unwrap_or_else(|_| map.to_string())
            );
            tracing::debug!(path = %path.display(), "config validated");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error loading config: {err:#}");
            ExitCode::FAILURE
        }
    }
}
