//! sqlfleet - SQL Server fleet monitor

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlfleet::server;

/// SQL Server fleet monitor
#[derive(Debug, Parser)]
#[command(name = "sqlfleet", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "SQLFLEET_CONFIG", default_value = "config/sqlfleet.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match server::run_server(&cli.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
