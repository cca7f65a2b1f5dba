//! Connect command - run the whole connectivity layer and print events.

use std::path::Path;
use std::sync::Arc;

use console::style;
use tracing::warn;

use rh_core::config::{AppConfig, ConfigHandle};
use rh_core::error::RhResult;
use rh_core::platform::RuntimeTarget;
use rh_models::event::{AppEvent, EventKind};
use rh_models::models::notification::{NotificationId, NotificationRecord};
use rh_services::{ProbeProvider, ServiceRegistry};
use rh_socket::WsConnector;

use crate::OutputFormat;

/// Run the connect command.
pub async fn run(
    config: ConfigHandle,
    config_path: &Path,
    url: Option<String>,
    save_config: bool,
    format: OutputFormat,
) -> RhResult<()> {
    if let Some(u) = url {
        config.write().await.server.api_url = AppConfig::sanitize_url(&u);
    }
    if save_config {
        config.read().await.save_to_file(config_path)?;
        println!("  {} Config saved to {}", style("OK").green(), config_path.display());
    }

    let cfg = config.snapshot().await;
    let target = RuntimeTarget::current();
    let tokens = super::token_store()?;
    let provider = Arc::new(ProbeProvider::from_config(&cfg.connectivity));
    let connector = Arc::new(WsConnector::from_config(&cfg.server, target));

    println!(
        "{} Checking {}...",
        style("[1/3]").bold().dim(),
        cfg.server.api_base_url(target)
    );
    let mut registry = ServiceRegistry::new(cfg, provider, connector.clone(), tokens.clone())?;
    match registry.api().health().await {
        Ok(latency) => println!(
            "  {} Server is reachable ({}ms).",
            style("OK").green().bold(),
            latency.as_millis()
        ),
        Err(e) => {
            // Keep going: watching the layer recover is the point of this command.
            println!("  {} Server check failed: {e}", style("WARN").yellow().bold());
        }
    }

    println!("{} Starting services...", style("[2/3]").bold().dim());
    let mut events = registry.event_bus().forward(EventKind::ALL);
    let mut visible = registry.notifications().subscribe();
    registry.start().await?;
    registry.ready().await;

    println!(
        "{} Real-time endpoint {}",
        style("[3/3]").bold().dim(),
        connector.endpoint()
    );
    if tokens.token().is_none() {
        println!(
            "  {} Not logged in; run `ridehail login` to receive live updates.",
            style("WARN").yellow()
        );
    }
    println!("  Listening for events... (Ctrl+C to stop)");
    println!();

    let mut last_shown = NotificationId(0);
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, format);
            }
            changed = visible.changed() => {
                if changed.is_err() {
                    break;
                }
                let records = visible.borrow_and_update().clone();
                for record in unseen(&records, last_shown) {
                    println!(
                        "  {} {}",
                        style(format!("[{}]", record.kind)).magenta().bold(),
                        record.message
                    );
                    last_shown = record.id;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n  Disconnecting...");
                break;
            }
        }
    }

    if let Err(e) = registry.shutdown_all().await {
        warn!("shutdown failed: {e}");
    }
    Ok(())
}

fn print_event(event: &AppEvent, format: OutputFormat) {
    let kind = event.kind();
    let detail = describe(event);
    match format {
        OutputFormat::Json => {
            let line = serde_json::json!({ "event": kind.as_str(), "detail": detail });
            println!("{line}");
        }
        OutputFormat::Text => {
            let label = format!("[{kind}]");
            let label = match kind {
                EventKind::Offline | EventKind::TransportFailed | EventKind::TransportError => {
                    style(label).red()
                }
                EventKind::Online | EventKind::TransportAuthenticated => style(label).green(),
                EventKind::TransportAuthRequired | EventKind::TransportReconnectScheduled => {
                    style(label).yellow()
                }
                _ => style(label).cyan(),
            };
            println!("  {label} {}", super::truncate(&detail, 120));
        }
    }
}

/// Records newer than `last_shown`, in display order.
fn unseen(records: &[NotificationRecord], last_shown: NotificationId) -> Vec<&NotificationRecord> {
    records.iter().filter(|r| r.id > last_shown).collect()
}

fn describe(event: &AppEvent) -> String {
    match event {
        AppEvent::Connectivity(inner) => format!("{inner:?}"),
        AppEvent::Transport(inner) => format!("{inner:?}"),
        AppEvent::Server(inner) => format!("{inner:?}"),
        AppEvent::Notify(inner) => inner.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_models::models::notification::NotificationKind;

    fn record(id: u64) -> NotificationRecord {
        NotificationRecord {
            id: NotificationId(id),
            kind: NotificationKind::Info,
            message: format!("note {id}"),
            duration_ms: Some(5_000),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_unseen_skips_already_printed_records() {
        let records = vec![record(1), record(2), record(3)];
        let mut last_shown = NotificationId(1);

        let mut printed = Vec::new();
        for record in unseen(&records, last_shown) {
            printed.push(record.id);
            last_shown = record.id;
        }

        assert_eq!(printed, vec![NotificationId(2), NotificationId(3)]);
        assert_eq!(last_shown, NotificationId(3));
        assert!(unseen(&records, last_shown).is_empty());
    }
}
