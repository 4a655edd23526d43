//! Queue subcommand handlers.

use std::path::Path;

use certqueue_config::Config;
use certqueue_core::Storage;
use certqueue_import::{
    IssuedCertificate, der_from_file_contents, enqueue_certificate, list_all_entries,
    list_role_entries,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{OutputFormat, QueueAction};
use crate::setup::open_storage;

/// Handle queue subcommands.
pub(crate) async fn handle_queue_command(
    action: QueueAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&config.storage).await?;
    match action {
        QueueAction::List { role, format } => {
            let rows = queue_rows(storage.as_ref(), role.as_deref()).await?;
            print!("{}", render_rows(&rows, format)?);
            Ok(())
        }
        QueueAction::Enqueue { role, serial, cert } => {
            let key = queue_file(storage.as_ref(), &role, serial.as_deref(), &cert).await?;
            println!("{}", key);
            Ok(())
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct QueueRow {
    role: String,
    entry: String,
}

async fn queue_rows(
    storage: &dyn Storage,
    role: Option<&str>,
) -> Result<Vec<QueueRow>, Box<dyn std::error::Error>> {
    let rows = match role {
        Some(role) => list_role_entries(storage, role)
            .await?
            .into_iter()
            .map(|entry| QueueRow {
                role: role.to_string(),
                entry,
            })
            .collect(),
        None => list_all_entries(storage)
            .await?
            .into_iter()
            .filter_map(|line| {
                line.split_once(": ").map(|(role, entry)| QueueRow {
                    role: role.to_string(),
                    entry: entry.to_string(),
                })
            })
            .collect(),
    };
    Ok(rows)
}

fn render_rows(rows: &[QueueRow], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(rows)?)),
        OutputFormat::Table => {
            if rows.is_empty() {
                return Ok("No queued certificates.\n".to_string());
            }
            let mut out = format!("{:<24} {}\n{}\n", "ROLE", "ENTRY", "-".repeat(60));
            for row in rows {
                out.push_str(&format!("{:<24} {}\n", row.role, row.entry));
            }
            Ok(out)
        }
    }
}

async fn queue_file(
    storage: &dyn Storage,
    role: &str,
    serial: Option<&str>,
    path: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    let contents = tokio::fs::read(path).await?;
    let der = der_from_file_contents(&contents)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    let cert = IssuedCertificate::from_der(&der)
        .map_err(|e| format!("{}: not an X.509 certificate: {}", path.display(), e))?;

    let serial = serial.unwrap_or(&cert.serial_number);
    let key = enqueue_certificate(storage, role, serial, der).await?;
    info!(role = %role, common_name = %cert.common_name, entry = %serial, "Certificate queued");
    Ok(key)
}
