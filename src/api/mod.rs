//! Remote point API
//!
//! This module defines the `PointApi` trait, the query sent to the point
//! generation service and the two response shapes it answers with.
//!
//! Responses are either
//! `{"result": {"points": [...]}}` or `{"status": 418, "error": "..."}`.

pub mod randonautica;

use crate::coord::Location;
use crate::error::{Error, Result};
use crate::profile::{EntropySource, Radius};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use randonautica::RandonauticaClient;

/// Trait for point generation backends
///
/// Implementations must be thread-safe (Send + Sync) to work with the async server.
pub trait PointApi: Send + Sync {
    /// Whether a credential is available; without one no call may be made
    fn has_credential(&self) -> bool;

    /// Upper bound for a single call
    fn timeout(&self) -> Duration;

    /// Issue one request
    ///
    /// Error statuses reported by the service come back as
    /// `Ok(ApiResponse::Failure)`; `Err` means the call itself failed.
    fn fetch(
        &self,
        endpoint: Endpoint,
        query: &PointQuery,
    ) -> impl std::future::Future<Output = Result<ApiResponse>> + Send;
}

/// Generation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Anomaly,
    Blindspot,
}

impl Endpoint {
    /// Path below the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Anomaly => crate::constants::api::ANOMALY_PATH,
            Self::Blindspot => crate::constants::api::BLINDSPOT_PATH,
        }
    }
}

/// Kind of anomaly to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Densest cluster
    Attractor,
    /// Emptiest region
    Void,
    /// Strongest deviation in either direction
    Power,
    /// Attractor and void pair
    Pair,
}

impl Default for AnomalyKind {
    fn default() -> Self {
        Self::Attractor
    }
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attractor => "attractor",
            Self::Void => "void",
            Self::Power => "power",
            Self::Pair => "pair",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attractor" => Ok(Self::Attractor),
            "void" => Ok(Self::Void),
            "power" => Ok(Self::Power),
            "pair" => Ok(Self::Pair),
            _ => Err(format!("Unknown anomaly type: {}", s)),
        }
    }
}

/// List all anomaly kinds
pub fn available_anomaly_kinds() -> Vec<AnomalyKind> {
    vec![
        AnomalyKind::Attractor,
        AnomalyKind::Void,
        AnomalyKind::Power,
        AnomalyKind::Pair,
    ]
}

/// Kind of blindspot to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlindspotKind {
    /// Use the profile's entropy source
    Quantum,
    /// Use pseudo entropy for this one request
    Pseudo,
}

impl Default for BlindspotKind {
    fn default() -> Self {
        Self::Quantum
    }
}

impl BlindspotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quantum => "quantum",
            Self::Pseudo => "pseudo",
        }
    }
}

impl fmt::Display for BlindspotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlindspotKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quantum" => Ok(Self::Quantum),
            "pseudo" => Ok(Self::Pseudo),
            _ => Err(format!("Unknown blindspot type: {}", s)),
        }
    }
}

/// List all blindspot kinds
pub fn available_blindspot_kinds() -> Vec<BlindspotKind> {
    vec![BlindspotKind::Quantum, BlindspotKind::Pseudo]
}

/// Query parameters for one request
#[derive(Debug, Clone, PartialEq)]
pub struct PointQuery {
    pub location: Location,
    pub radius: Radius,
    pub source: EntropySource,
    pub kind: Option<AnomalyKind>,
}

impl PointQuery {
    /// Render as `latitude=..&longitude=..&radius=..&source=..[&type=..]`
    pub fn to_query_string(&self) -> String {
        let mut params = vec![
            ("latitude", self.location.latitude.to_string()),
            ("longitude", self.location.longitude.to_string()),
            ("radius", self.radius.to_string()),
            ("source", self.source.to_string()),
        ];
        if let Some(kind) = self.kind {
            params.push(("type", kind.to_string()));
        }

        params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Category of a returned point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointType {
    Blindspot,
    Attractor,
    Void,
}

impl PointType {
    /// Map the numeric `type` field of a point
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Blindspot),
            1 => Some(Self::Attractor),
            2 => Some(Self::Void),
            _ => None,
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blindspot => write!(f, "Blindspot"),
            Self::Attractor => write!(f, "Attractor"),
            Self::Void => write!(f, "Void"),
        }
    }
}

/// Coordinates of a returned point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single point returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPoint {
    /// Index into Blindspot/Attractor/Void
    #[serde(rename = "type", default)]
    pub point_type: i64,
    pub location: PointLocation,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub z_score: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub bearing: f64,
}

impl ApiPoint {
    pub fn kind(&self) -> Option<PointType> {
        PointType::from_index(self.point_type)
    }
}

/// Successful payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsResult {
    #[serde(default)]
    pub points: Vec<ApiPoint>,
}

/// Parsed response of the point service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Points { result: PointsResult },
    Failure { status: u16, error: String },
}

impl ApiResponse {
    /// Parse a response body
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| Error::Transport(format!("Unexpected API response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn query(kind: Option<AnomalyKind>) -> PointQuery {
        PointQuery {
            location: Location::new(29.97913, 31.13427),
            radius: Radius::new(3000).unwrap(),
            source: EntropySource::Temporal,
            kind,
        }
    }

    #[test]
    fn test_query_string() {
        assert_eq!(
            query(None).to_query_string(),
            "latitude=29.97913&longitude=31.13427&radius=3000&source=temporal"
        );
        assert_eq!(
            query(Some(AnomalyKind::Void)).to_query_string(),
            "latitude=29.97913&longitude=31.13427&radius=3000&source=temporal&type=void"
        );
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Anomaly.path(), "/gen/anomaly");
        assert_eq!(Endpoint::Blindspot.path(), "/gen/blindspot");
    }

    #[test]
    fn test_anomaly_kind_from_str() {
        assert_eq!("Attractor".parse::<AnomalyKind>().unwrap(), AnomalyKind::Attractor);
        assert_eq!("pair".parse::<AnomalyKind>().unwrap(), AnomalyKind::Pair);
        assert!("blindspot".parse::<AnomalyKind>().is_err());
        assert_eq!(available_anomaly_kinds().len(), 4);
    }

    #[test]
    fn test_blindspot_kind_from_str() {
        assert_eq!("pseudo".parse::<BlindspotKind>().unwrap(), BlindspotKind::Pseudo);
        assert_eq!("QUANTUM".parse::<BlindspotKind>().unwrap(), BlindspotKind::Quantum);
        assert!("temporal".parse::<BlindspotKind>().is_err());
    }

    #[test]
    fn test_point_type_from_index() {
        assert_eq!(PointType::from_index(0), Some(PointType::Blindspot));
        assert_eq!(PointType::from_index(2), Some(PointType::Void));
        assert_eq!(PointType::from_index(3), None);
        assert_eq!(PointType::Attractor.to_string(), "Attractor");
    }

    #[test]
    fn test_parse_points_response() {
        let body = r#"{"result": {"points": [{
            "type": 1,
            "location": {"latitude": 29.98, "longitude": 31.13},
            "power": 2.345, "radius": 120.5, "z_score": 4.2,
            "distance": 1500.25, "bearing": 87.5
        }]}}"#;

        let ApiResponse::Points { result } = ApiResponse::from_body(body).unwrap() else {
            panic!("expected points");
        };
        let point = &result.points[0];
        assert_eq!(point.kind(), Some(PointType::Attractor));
        assert_relative_eq!(point.power, 2.345);
        assert_relative_eq!(point.location.longitude, 31.13);
    }

    #[test]
    fn test_parse_blindspot_point_without_metrics() {
        let body = r#"{"result": {"points": [{
            "location": {"latitude": 1.0, "longitude": 2.0},
            "distance": 10.0, "bearing": 20.0
        }]}}"#;

        let ApiResponse::Points { result } = ApiResponse::from_body(body).unwrap() else {
            panic!("expected points");
        };
        assert_eq!(result.points[0].point_type, 0);
        assert_eq!(result.points[0].power, 0.0);
    }

    #[test]
    fn test_parse_error_response() {
        let response = ApiResponse::from_body(r#"{"status": 418, "error": "nothing"}"#).unwrap();
        assert_eq!(
            response,
            ApiResponse::Failure {
                status: 418,
                error: "nothing".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unknown_shape() {
        assert!(matches!(
            ApiResponse::from_body(r#"{"hello": "world"}"#),
            Err(Error::Transport(_))
        ));
        assert!(ApiResponse::from_body("not json").is_err());
    }
}
