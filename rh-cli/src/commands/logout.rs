//! Logout command.

use console::style;

use rh_core::config::ConfigHandle;
use rh_core::error::RhResult;

/// Run the logout command. The local token is removed even if the server is down.
pub async fn run(config: ConfigHandle) -> RhResult<()> {
    let tokens = super::token_store()?;
    if tokens.token().is_none() {
        println!("  Not logged in.");
        return Ok(());
    }

    let api = super::create_api_client(&config, tokens).await?;
    match api.logout().await {
        Ok(()) => println!("  {} Logged out.", style("OK").green().bold()),
        Err(e) => println!(
            "  {} Server logout failed ({e}); local session removed.",
            style("WARN").yellow().bold()
        ),
    }
    Ok(())
}
