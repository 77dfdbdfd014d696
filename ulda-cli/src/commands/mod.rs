//! CLI command implementations (init, show, list, add, update).

pub mod add;
pub mod init;
pub mod list;
pub mod show;
pub mod update;

use tracing::info;

use ulda_core::{MasterFile, VaultClient};

use crate::config::Config;
use crate::platform::NativeRandom;
use crate::transport::TcpChannel;

pub type Client = VaultClient<TcpChannel, NativeRandom>;

/// Connect to the configured store.
pub async fn connect(config: &Config) -> Result<Client, Box<dyn std::error::Error>> {
    let channel = TcpChannel::connect(&config.server).await?;
    Ok(VaultClient::new(
        channel,
        NativeRandom::new(),
        config.client_config(),
    ))
}

/// Get the vault password from `ULDA_PASSWORD` (for scripting) or prompt interactively.
pub fn read_password(config: &Config, confirm: bool) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(password) = &config.password {
        return Ok(password.clone());
    }

    let password = rpassword::prompt_password("Enter vault password: ")?;
    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }
    if confirm {
        let again = rpassword::prompt_password("Confirm vault password: ")?;
        if password != again {
            return Err("Passwords do not match".into());
        }
    }
    Ok(password)
}

/// Connect, prompt for the password, and open the existing vault.
pub async fn open_vault(config: &Config) -> Result<(Client, MasterFile), Box<dyn std::error::Error>> {
    let password = read_password(config, false)?;
    let mut client = connect(config).await?;
    let master = client.get_vault(&config.api_key, &password).await?;
    info!(files = master.files.len(), "vault opened");
    Ok((client, master))
}

/// Parse a JSON payload given on the command line.
pub fn parse_payload(raw: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    serde_json::from_str(raw).map_err(|e| format!("payload is not valid JSON: {e}").into())
}
