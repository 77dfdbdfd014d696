mod commands;
mod config;
mod platform;
mod transport;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "ulda", about = "Zero-knowledge personal vault client")]
struct Cli {
    /// Store address (host:port). Falls back to ULDA_SERVER.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Api key identifying the vault on the store. Falls back to ULDA_API_KEY.
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault on the store
    Init,

    /// Show the vault's signature window and record ids
    Show,

    /// Decrypt and list every content record
    List,

    /// Add a named content record
    Add {
        /// Record name
        name: String,

        /// JSON payload, e.g. '{"hello":"world"}'
        payload: String,
    },

    /// Replace the payload of an existing record
    Update {
        /// Record id (from `ulda show`)
        id: u64,

        /// New JSON payload
        payload: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing (controlled by RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (non-fatal if missing).
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("no .env file loaded: {e}");
    }

    let cli = Cli::parse();

    let config = match Config::from_env(cli.server, cli.api_key) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(server = %config.server, "configuration loaded");

    let result = match cli.command {
        Commands::Init => commands::init::run_init(&config).await,
        Commands::Show => commands::show::run_show(&config).await,
        Commands::List => commands::list::run_list(&config).await,
        Commands::Add { name, payload } => commands::add::run_add(&config, &name, &payload).await,
        Commands::Update { id, payload } => {
            commands::update::run_update(&config, id, &payload).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
