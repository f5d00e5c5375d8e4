//! Fetch command handlers
//!
//! Request an anomaly or a blindspot around a user's stored location.

use crate::api::{AnomalyKind, BlindspotKind};
use crate::cli::print_reply;
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::{Orchestrator, Reply};
use clap::Args;

#[derive(Args)]
pub struct AnomalyArgs {
    /// User id
    pub user: String,

    /// Anomaly type: attractor, void, power or pair
    pub kind: Option<AnomalyKind>,
}

#[derive(Args)]
pub struct BlindspotArgs {
    /// User id
    pub user: String,

    /// Blindspot type: quantum or pseudo
    pub kind: Option<BlindspotKind>,
}

pub async fn anomaly(args: AnomalyArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&Config::load()?)?;
    let outcome = orchestrator
        .fetch_anomaly(&args.user, args.kind.unwrap_or_default())
        .await;
    print_reply(&Reply::from(outcome));
    Ok(())
}

pub async fn blindspot(args: BlindspotArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&Config::load()?)?;
    let outcome = orchestrator
        .fetch_blindspot(&args.user, args.kind.unwrap_or_default())
        .await;
    print_reply(&Reply::from(outcome));
    Ok(())
}
