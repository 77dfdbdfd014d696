use std::env;
use std::time::Duration;

use ulda_core::ClientConfig;

/// CLI configuration loaded from environment variables and flags.
pub struct Config {
    /// Store address (`host:port`).
    pub server: String,
    /// Key the store indexes the vault by.
    pub api_key: String,
    /// Vault password, if provided non-interactively.
    pub password: Option<String>,
    pub call_timeout: Option<Duration>,
    pub pbkdf2_iterations: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables, letting flags win.
    ///
    /// - `ULDA_SERVER` (required unless `--server`): store address.
    /// - `ULDA_API_KEY` (required unless `--api-key`).
    /// - `ULDA_PASSWORD` (optional): skips the interactive prompt.
    /// - `ULDA_CALL_TIMEOUT_SECS` (optional, default 30, 0 disables).
    /// - `ULDA_PBKDF2_ITERATIONS` (optional): iterations for newly sealed envelopes.
    pub fn from_env(server: Option<String>, api_key: Option<String>) -> Result<Self, String> {
        let server = server
            .or_else(|| env::var("ULDA_SERVER").ok())
            .ok_or("no store address: pass --server or set ULDA_SERVER")?;
        let api_key = api_key
            .or_else(|| env::var("ULDA_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or("no api key: pass --api-key or set ULDA_API_KEY")?;

        let password = env::var("ULDA_PASSWORD").ok().filter(|p| !p.is_empty());

        let call_timeout = match env::var("ULDA_CALL_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Some(Duration::from_secs(30)),
        };

        let pbkdf2_iterations = env::var("ULDA_PBKDF2_ITERATIONS")
            .ok()
            .map(|raw| {
                raw.parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(format!("ULDA_PBKDF2_ITERATIONS must be a positive integer, got {raw:?}"))
            })
            .transpose()?;

        Ok(Self {
            server,
            api_key,
            password,
            call_timeout,
            pbkdf2_iterations,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        if let Some(iterations) = self.pbkdf2_iterations {
            config = config.with_iterations(iterations);
        }
        if let Some(timeout) = self.call_timeout {
            config = config.with_call_timeout(timeout);
        }
        config
    }
}

fn parse_timeout(raw: &str) -> Result<Option<Duration>, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(_) => Err(format!(
            "ULDA_CALL_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
        )),
    }
}
