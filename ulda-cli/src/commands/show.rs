use crate::config::Config;

/// Show the master file: signature window and referenced content ids.
pub async fn run_show(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (_client, master) = super::open_vault(config).await?;

    println!("Vault Status");
    println!("============");
    println!("  Server:  {}", config.server);
    if let (Some(min), Some(max)) = (master.signatures.min_index(), master.signatures.max_index()) {
        println!("  Window:  {min}..={max}");
    }
    println!("  Records: {}", master.files.len());
    for id in master.content_ids() {
        println!("    #{id}");
    }
    Ok(())
}
