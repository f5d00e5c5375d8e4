//! Per-user search profiles
//!
//! A profile holds the search center, the search radius, the entropy source
//! and the time of the last rate-limited request for a single user.

pub mod store;

use crate::constants::profile::{RADIUS_MAX, RADIUS_MIN};
use crate::coord::Location;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use store::ProfileStore;

/// Search radius in meters, always within `RADIUS_MIN..=RADIUS_MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Radius(u32);

impl Radius {
    /// Create a radius, rejecting values outside the allowed range
    pub fn new(meters: u32) -> Result<Self> {
        if (RADIUS_MIN..=RADIUS_MAX).contains(&meters) {
            Ok(Self(meters))
        } else {
            Err(Error::InvalidRadius(format!(
                "{} is outside [{}, {}]",
                meters, RADIUS_MIN, RADIUS_MAX
            )))
        }
    }

    /// Radius in meters
    pub fn meters(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Radius {
    type Error = Error;

    fn try_from(meters: u32) -> Result<Self> {
        Self::new(meters)
    }
}

impl From<Radius> for u32 {
    fn from(radius: Radius) -> Self {
        radius.0
    }
}

impl fmt::Display for Radius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Randomness basis used by the remote point generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntropySource {
    /// Time-seeded quantum entropy
    Temporal,
    /// Pseudo-random entropy
    Pseudo,
}

impl EntropySource {
    /// Name used in the API query and in replies
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Pseudo => "pseudo",
        }
    }

    /// All selectable sources, in display order
    pub fn available() -> &'static [EntropySource] {
        &[Self::Temporal, Self::Pseudo]
    }
}

impl fmt::Display for EntropySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntropySource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "temporal" => Ok(Self::Temporal),
            "pseudo" => Ok(Self::Pseudo),
            _ => Err(Error::InvalidSource(s.to_string())),
        }
    }
}

/// Values a new profile starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileDefaults {
    pub radius: Radius,
    pub source: EntropySource,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            radius: Radius(crate::config::defaults::DEFAULT_RADIUS),
            source: EntropySource::Temporal,
        }
    }
}

/// Stored search configuration of a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Opaque user id, unique within the store
    pub id: String,

    /// Search center
    pub location: Location,

    /// Search radius
    pub radius: Radius,

    /// Entropy source used for point generation
    pub source: EntropySource,

    /// Epoch seconds of the last allowed fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_request: Option<i64>,
}

impl Profile {
    /// Create a profile with the given location and defaults
    pub fn new(id: impl Into<String>, location: Location, defaults: ProfileDefaults) -> Self {
        Self {
            id: id.into(),
            location,
            radius: defaults.radius,
            source: defaults.source,
            last_request: None,
        }
    }

    /// Overwrite a single field
    pub fn apply(&mut self, field: ProfileField) {
        match field {
            ProfileField::Location(location) => self.location = location,
            ProfileField::Radius(radius) => self.radius = radius,
            ProfileField::Source(source) => self.source = source,
            ProfileField::LastRequest(timestamp) => self.last_request = Some(timestamp),
        }
    }
}

/// A single profile field with its new value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileField {
    Location(Location),
    Radius(Radius),
    Source(EntropySource),
    LastRequest(i64),
}
