//! Status command handler
//!
//! Shows configuration, profile store and server status.

use crate::config::Config;
use crate::error::Result;
use crate::profile::ProfileStore;
use clap::Args;

/// Status command arguments
#[derive(Args)]
pub struct StatusArgs {
    /// Check if server is running (tries to connect)
    #[arg(long)]
    pub server: bool,

    /// List stored user ids
    #[arg(long)]
    pub users: bool,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<()> {
    let config = Config::load()?;

    println!("fatum v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Config: {}", Config::config_path()?.display());
    println!("API:    {}", config.api.base_url);
    println!(
        "Token:  {}",
        if config.api_token().is_some() {
            "configured"
        } else {
            "NOT CONFIGURED"
        }
    );
    println!();

    let store_path = config.store_path()?;
    match ProfileStore::open(&store_path) {
        Ok(store) => {
            println!("Store:  {} ({} profiles)", store_path.display(), store.len());
            if args.users {
                for id in store.ids() {
                    println!("  {}", id);
                }
            }
        }
        Err(e) => println!("Store:  {} (error: {})", store_path.display(), e),
    }
    println!();

    if args.server {
        check_server_status(&config).await;
    }

    Ok(())
}

/// Check if the server is running
async fn check_server_status(config: &Config) {
    let url = format!("http://{}/api/status", config.server_addr());

    match reqwest::get(&url).await {
        Ok(response) => {
            if response.status().is_success() {
                println!("Server: RUNNING on {}", config.server_addr());
                if let Ok(status) = response.json::<serde_json::Value>().await {
                    if let Some(version) = status.get("version").and_then(|v| v.as_str()) {
                        println!("  Version: {}", version);
                    }
                    if let Some(profiles) = status.get("profiles").and_then(|v| v.as_u64()) {
                        println!("  Profiles: {}", profiles);
                    }
                }
            } else {
                println!("Server: ERROR (status {})", response.status());
            }
        }
        Err(_) => {
            println!("Server: NOT RUNNING on {}", config.server_addr());
        }
    }
}
