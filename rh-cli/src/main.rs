//! Ridehail CLI - Command-line front-end for the client connectivity layer.
//!
//! Runs the reachability observer, real-time transport and notification
//! queue against a live server from the terminal. Useful for headless
//! testing of the server's real-time channel and for scripting.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use rh_core::config::{AppConfig, ConfigHandle};
use rh_core::error::RhResult;
use rh_core::logging;

/// Ridehail - ride-hailing client.
#[derive(Parser)]
#[command(
    name = "ridehail",
    version,
    about = "Ridehail client CLI",
    long_about = "A command-line interface for the Ridehail client.\n\
                  Connects to the ride-hailing server, prints real-time events and \
                  sends driver and rider actions."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full connectivity layer and print bus events until Ctrl+C.
    Connect {
        /// API base URL (overrides config).
        #[arg(short, long)]
        url: Option<String>,
        /// Save the URL to the config file.
        #[arg(long)]
        save: bool,
    },
    /// Log in and store the session token.
    Login {
        /// Account email; prompted if omitted.
        #[arg(short, long)]
        email: Option<String>,
    },
    /// End the session and remove the stored token.
    Logout,
    /// Show server reachability and session status.
    Status,
    /// Send a single real-time action.
    Send {
        #[command(subcommand)]
        action: commands::send::SendAction,
    },
    /// View and create the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn load_config(path: Option<&PathBuf>) -> RhResult<(AppConfig, PathBuf)> {
    match path {
        Some(p) => Ok((AppConfig::load_from_file(p)?, p.clone())),
        None => Ok((AppConfig::load_default()?, AppConfig::default_config_path()?)),
    }
}

#[tokio::main]
async fn main() -> RhResult<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = load_config(cli.config.as_ref())?;
    if cli.verbose {
        config.logging.level = "debug".into();
    }
    let _guard = logging::init_logging(&config.logging, &config.effective_log_dir()?)?;

    info!("Ridehail CLI v{}", rh_core::constants::APP_VERSION);
    let config_handle = ConfigHandle::new(config);

    match cli.command {
        Commands::Connect { url, save } => {
            commands::connect::run(config_handle, &config_path, url, save, cli.format).await
        }
        Commands::Login { email } => commands::login::run(config_handle, email, cli.format).await,
        Commands::Logout => commands::logout::run(config_handle).await,
        Commands::Status => commands::status::run(config_handle, cli.format).await,
        Commands::Send { action } => commands::send::run(config_handle, action).await,
        Commands::Config { action } => {
            commands::config::run(config_handle, &config_path, action, cli.format).await
        }
    }
}
