//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod fetch;
pub mod profile;
pub mod serve;
pub mod session;
pub mod status;

use crate::orchestrator::Reply;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Randonautica point finder
#[derive(Parser)]
#[command(name = "fatum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Set a user's search center from coordinates or a map link
    Location(session::LocationArgs),

    /// Set a user's search radius in meters
    Radius(session::RadiusArgs),

    /// Set a user's entropy source
    Source(session::SourceArgs),

    /// Fetch an anomaly for a user
    Anomaly(fetch::AnomalyArgs),

    /// Fetch a blindspot for a user
    Blindspot(fetch::BlindspotArgs),

    /// Show a user's stored profile
    Profile(profile::ProfileArgs),

    /// Show configuration and store status
    Status(status::StatusArgs),
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    init_tracing(default_level);

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Location(args) => session::location(args).await,
        Commands::Radius(args) => session::radius(args).await,
        Commands::Source(args) => session::source(args).await,
        Commands::Anomaly(args) => fetch::anomaly(args).await,
        Commands::Blindspot(args) => fetch::blindspot(args).await,
        Commands::Profile(args) => profile::run(args),
        Commands::Status(args) => status::run(args).await,
    }
}

/// Initialize logging to stderr; `RUST_LOG` overrides `default_level`
fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Print reply strings, separated by blank lines
pub fn print_reply(reply: &Reply) {
    println!("{}", reply.lines().join("\n\n"));
}
