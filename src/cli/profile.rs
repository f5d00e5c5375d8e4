//! Profile command handler
//!
//! Shows a stored profile without touching it.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::profile::ProfileStore;
use chrono::{TimeZone, Utc};
use clap::Args;

#[derive(Args)]
pub struct ProfileArgs {
    /// User id
    pub user: String,

    /// Print the profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ProfileArgs) -> Result<()> {
    let config = Config::load()?;
    let store = ProfileStore::open(config.store_path()?)?;

    let profile = store
        .get(&args.user)
        .ok_or_else(|| Error::Store(format!("No profile for user: {}", args.user)))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("User:     {}", profile.id);
    println!("Location: {}", profile.location);
    println!("Radius:   {}m", profile.radius);
    println!("Source:   {}", profile.source);
    match profile.last_request.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
        Some(at) => println!("Last request: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last request: never"),
    }

    Ok(())
}
