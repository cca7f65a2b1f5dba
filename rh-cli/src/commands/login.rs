//! Login command - exchange credentials for a stored session token.

use console::style;
use dialoguer::{Input, Password};

use rh_core::config::ConfigHandle;
use rh_core::error::RhResult;

use crate::OutputFormat;

/// Run the login command.
pub async fn run(config: ConfigHandle, email: Option<String>, format: OutputFormat) -> RhResult<()> {
    let email = match email {
        Some(e) => e,
        None => Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(super::prompt_error)?,
    };
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(super::prompt_error)?;

    let api = super::create_api_client(&config, super::token_store()?).await?;
    let user = api.login(&email, &password).await?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "id": user.id,
                    "name": user.name,
                    "email": user.email,
                    "role": user.role.to_string(),
                })
            );
        }
        OutputFormat::Text => {
            println!(
                "  {} Logged in as {} <{}> ({})",
                style("OK").green().bold(),
                user.name,
                user.email,
                user.role
            );
        }
    }
    Ok(())
}
