//! fatum: Randonautica point finder
//!
//! A library, CLI and HTTP service that finds "anomalies" and "blindspots"
//! around a user's location through the Randonautica point API.
//!
//! ## Features
//!
//! - Per-user profiles (location, radius, entropy source) persisted as JSON
//! - Per-user rate limiting of API requests
//! - Coordinate extraction from free text and map links
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fatum::api::{AnomalyKind, RandonauticaClient};
//! use fatum::coord::Location;
//! use fatum::orchestrator::{Orchestrator, Reply};
//! use fatum::profile::{ProfileDefaults, ProfileStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> fatum::Result<()> {
//! let store = Arc::new(ProfileStore::open("profiles.json")?);
//! let api = RandonauticaClient::new(
//!     "https://api.randonautica.com/v1",
//!     Some("token".to_string()),
//!     Duration::from_secs(30),
//! )?;
//! let orchestrator = Orchestrator::new(store, api, ProfileDefaults::default());
//!
//! orchestrator.set_location("alice", Location::new(40.7128, -74.0060)).await;
//! let outcome = orchestrator.fetch_anomaly("alice", AnomalyKind::Attractor).await;
//! for line in Reply::from(outcome).lines() {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod limiter;
pub mod orchestrator;
pub mod profile;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use coord::Location;
pub use error::{Error, Result};
pub use orchestrator::{FetchOutcome, Orchestrator, Reply, UpdateOutcome};
pub use profile::{EntropySource, Profile, ProfileStore, Radius};
