use tracing::{info, warn};

use ulda_core::UldaError;

use crate::config::Config;

/// Store a new named content record and link it into the vault.
///
/// If the record is stored but linking fails, linking is retried once before
/// giving up; the record is never created twice.
pub async fn run_add(
    config: &Config,
    name: &str,
    payload: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = super::parse_payload(payload)?;
    let (mut client, master) = super::open_vault(config).await?;

    let id = match client.create_content(&master, payload, name).await {
        Ok(created) => created.record.id,
        Err(UldaError::OrphanedContent { pending, source }) => {
            warn!(id = pending.id, error = %source, "record stored but not linked, retrying link");
            let linked = client.link_content(&master, &pending).await?;
            info!(files = linked.files.len(), "record linked on retry");
            pending.id
        }
        Err(e) => return Err(e.into()),
    };

    println!("Added '{name}' as record #{id}");
    Ok(())
}
