//! Server shared state
//!
//! Holds configuration and the orchestrator for the HTTP server.

use crate::api::RandonauticaClient;
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use std::time::Instant;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    /// User workflows over the shared profile store
    pub orchestrator: Orchestrator<RandonauticaClient>,

    started: Instant,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: Config) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(&config)?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Create application state around an existing orchestrator
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator<RandonauticaClient>) -> Self {
        Self {
            config,
            orchestrator,
            started: Instant::now(),
        }
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
