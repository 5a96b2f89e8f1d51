//! exponea-crashes - Inspect and send locally stored crash logs
//!
//! Provides commands for:
//! - Listing and viewing stored crash logs
//! - Uploading them to the collector
//! - Deleting them
//! - Inspecting the telemetry configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use exponea_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand,
    crashes::{DeleteCommand, ListCommand, SendCommand, ViewCommand},
    CliContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "exponea-crashes",
    version,
    about = "Manage crash logs captured by the Exponea SDK"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List stored crash logs
    List(ListCommand),
    /// Show one crash log
    View(ViewCommand),
    /// Upload stored crash logs and delete the delivered ones
    Send(SendCommand),
    /// Delete stored crash logs
    Delete(DeleteCommand),
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext {
        format,
        config_path,
        config,
    };

    match cli.command {
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::View(cmd) => cmd.execute(&ctx).await,
        Commands::Send(cmd) => cmd.execute(&ctx).await,
        Commands::Delete(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
