//! Status command - show server reachability and session state.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use console::style;

use rh_core::config::ConfigHandle;
use rh_core::error::RhResult;
use rh_core::platform::{Platform, RuntimeTarget};

use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> RhResult<()> {
    let cfg = config.snapshot().await;
    let target = RuntimeTarget::current();
    let tokens = super::token_store()?;
    let logged_in = tokens.token().is_some();
    let api = super::create_api_client(&config, tokens).await?;

    let health = api.health().await;
    let user = if logged_in && health.is_ok() {
        api.current_user().await.ok()
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "api_url": cfg.server.api_base_url(target),
                "socket_url": cfg.server.socket_endpoint(target),
                "server_reachable": health.is_ok(),
                "latency_ms": health.as_ref().ok().map(|d| d.as_millis() as u64),
                "logged_in": logged_in,
                "user": user.as_ref().map(|u| serde_json::json!({
                    "id": u.id,
                    "email": u.email,
                    "role": u.role.to_string(),
                })),
                "platform": Platform::current().name(),
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["Item", "Value"]);
            table.add_row(vec!["API".to_string(), cfg.server.api_base_url(target)]);
            table.add_row(vec!["Socket".to_string(), cfg.server.socket_endpoint(target)]);
            table.add_row(vec![
                "Server".to_string(),
                match &health {
                    Ok(latency) => format!("reachable ({}ms)", latency.as_millis()),
                    Err(e) => format!("unreachable: {e}"),
                },
            ]);
            table.add_row(vec![
                "Session".to_string(),
                match (&user, logged_in) {
                    (Some(u), _) => format!("{} <{}> as {}", u.name, u.email, u.role),
                    (None, true) => "token stored, not verified".to_string(),
                    (None, false) => "not logged in".to_string(),
                },
            ]);
            table.add_row(vec!["Platform".to_string(), Platform::current().to_string()]);

            println!("{}", style("Status").bold().underlined());
            println!("{table}");
        }
    }
    Ok(())
}
