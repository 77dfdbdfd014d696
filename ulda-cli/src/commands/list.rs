use tracing::warn;

use crate::config::Config;

/// Decrypt and print every content record in the vault.
///
/// Records that fail to open are reported on stderr; the rest still print.
pub async fn run_list(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (mut client, master) = super::open_vault(config).await?;
    let listing = client.list_content(&master).await?;

    if listing.records.is_empty() && listing.failures.is_empty() {
        println!("No content records.");
        return Ok(());
    }

    println!("{:<6} {:<24} PAYLOAD", "ID", "NAME");
    for (name, record) in &listing.records {
        println!("{:<6} {:<24} {}", record.id, name, record.payload);
    }

    for failure in &listing.failures {
        warn!(id = failure.id, "record skipped");
        eprintln!("#{}: {}", failure.id, failure.error);
    }
    if !listing.is_complete() {
        eprintln!("{} record(s) could not be opened", listing.failures.len());
    }
    Ok(())
}
