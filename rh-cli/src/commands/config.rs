//! Config command - show, locate and create the configuration file.

use std::path::Path;

use clap::Subcommand;
use console::style;

use rh_core::config::{AppConfig, ConfigHandle};
use rh_core::error::{RhError, RhResult};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub async fn run(
    config: ConfigHandle,
    path: &Path,
    action: ConfigAction,
    format: OutputFormat,
) -> RhResult<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config.read().await;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*cfg)?),
                OutputFormat::Text => {
                    let text = toml::to_string_pretty(&*cfg)
                        .map_err(|e| RhError::Config(format!("failed to render config: {e}")))?;
                    println!("{text}");
                }
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!(
                    "  {} {} already exists (use --force to overwrite).",
                    style("SKIP").yellow().bold(),
                    path.display()
                );
                return Ok(());
            }
            AppConfig::default().save_to_file(path)?;
            println!("  {} Wrote {}", style("OK").green().bold(), path.display());
        }
    }
    Ok(())
}
