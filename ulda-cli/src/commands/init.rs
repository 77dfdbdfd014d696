use tracing::info;

use crate::config::Config;

/// Create a new vault on the store for the configured api key.
///
/// Fails with a conflict if the store already holds a vault for that key.
pub async fn run_init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let password = super::read_password(config, true)?;
    let mut client = super::connect(config).await?;

    info!("Creating vault (this may take a moment)...");
    let master = client.create_vault(&config.api_key, &password).await?;

    println!("Vault created on {}", config.server);
    if let (Some(min), Some(max)) = (master.signatures.min_index(), master.signatures.max_index()) {
        println!("Signature window: {min}..={max}");
    }
    println!("Remember your password -- there is no recovery mechanism.");
    Ok(())
}
