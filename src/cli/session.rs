//! Settings command handlers
//!
//! `location`, `radius` and `source` change one field of a user's profile.

use crate::cli::print_reply;
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::{Orchestrator, Reply};
use clap::Args;

#[derive(Args)]
pub struct LocationArgs {
    /// User id
    pub user: String,

    /// Coordinates, a map link or any text containing `lat,lon`
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct RadiusArgs {
    /// User id
    pub user: String,

    /// Radius in meters
    #[arg(allow_negative_numbers = true)]
    pub meters: i64,
}

#[derive(Args)]
pub struct SourceArgs {
    /// User id
    pub user: String,

    /// Entropy source name
    pub name: String,
}

pub async fn location(args: LocationArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&Config::load()?)?;
    let outcome = orchestrator
        .set_location_from_text(&args.user, &args.text.join(" "))
        .await;
    print_reply(&Reply::from(outcome));
    Ok(())
}

pub async fn radius(args: RadiusArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&Config::load()?)?;
    let outcome = orchestrator.set_radius(&args.user, args.meters).await;
    print_reply(&Reply::from(outcome));
    Ok(())
}

pub async fn source(args: SourceArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&Config::load()?)?;
    let outcome = orchestrator.set_source(&args.user, &args.name).await;
    print_reply(&Reply::from(outcome));
    Ok(())
}
