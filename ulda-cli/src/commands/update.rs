use crate::config::Config;

/// Replace the payload of an existing content record.
pub async fn run_update(
    config: &Config,
    id: u64,
    payload: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = super::parse_payload(payload)?;
    let (mut client, master) = super::open_vault(config).await?;

    let record = client.update_content(&master, id, payload).await?;
    println!("Updated '{}' (#{})", record.name, record.id);
    Ok(())
}
