//! Reply payloads
//!
//! Renders workflow outcomes into the ordered list of strings sent back to
//! the chat front end. Successful fetches answer with a human-readable
//! message followed by a machine-readable coordinate line (`@@lat,lon` for
//! anomalies, `geo:lat,lon` for blindspots); everything else answers with a
//! single message.

use crate::constants::profile::{RADIUS_MAX, RADIUS_MIN};
use crate::constants::tags;
use crate::orchestrator::{FetchOutcome, FoundKind, FoundPoint, UpdateOutcome};
use crate::profile::EntropySource;
use serde::{Deserialize, Serialize};

pub const MSG_SET_LOCATION: &str = "Please set your location first.\nSend your location, a map link, or coordinates in this format: `28.3809,-16.5379`";
pub const MSG_NO_TOKEN: &str = "No Randonautica API token configured. Aborting.";
pub const MSG_NO_ANOMALY_FOUND: &str =
    "Sorry, no anomaly could be found. Please increase your search radius or try again.";
pub const MSG_NO_POINTS: &str = "The API returned no points.";
pub const MSG_STORE_UNAVAILABLE: &str = "Could not save your settings, please try again.";

/// Ordered reply strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(pub Vec<String>);

impl Reply {
    fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

fn radius_limits() -> String {
    format!(
        "Please provide a radius in meters.\nMin. {} and max. {}.",
        RADIUS_MIN, RADIUS_MAX
    )
}

fn available_sources() -> String {
    EntropySource::available()
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn found(found: &FoundPoint) -> Reply {
    let point = &found.point;
    let lat = point.location.latitude;
    let lon = point.location.longitude;

    match found.kind {
        FoundKind::Anomaly => {
            let type_name = point
                .kind()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            Reply(vec![
                format!(
                    "{} anomaly found:\nEntropy: `{}`\nLatitude: `{}`\nLongitude: `{}`\nPower: `{:.2}`\nRadius: `{:.2}`m\nZ-score: `{:.2}`\nDistance: `{:.2}`m\nBearing: `{:.2}`°",
                    type_name,
                    found.source,
                    lat,
                    lon,
                    point.power,
                    point.radius,
                    point.z_score,
                    point.distance,
                    point.bearing
                ),
                format!("{}{},{}", tags::ANOMALY, lat, lon),
            ])
        }
        FoundKind::Blindspot => Reply(vec![
            format!(
                "Blindspot found:\nEntropy: `{}`\nLatitude: `{}`\nLongitude: `{}`\nDistance: `{:.2}`m\nBearing: `{:.2}`°",
                found.source, lat, lon, point.distance, point.bearing
            ),
            format!("{}{},{}", tags::BLINDSPOT, lat, lon),
        ]),
    }
}

impl From<&FetchOutcome> for Reply {
    fn from(outcome: &FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Found(point) => found(point),
            FetchOutcome::NoProfile => Reply::single(MSG_SET_LOCATION),
            FetchOutcome::RateLimited { wait_secs } => Reply::single(format!(
                "Sorry, you are requesting too many points in a too short time period.\nPlease try again in {} seconds.",
                wait_secs
            )),
            FetchOutcome::NoResult => Reply::single(MSG_NO_ANOMALY_FOUND),
            FetchOutcome::ApiError(message) => Reply::single(message.clone()),
            FetchOutcome::MissingCredential => Reply::single(MSG_NO_TOKEN),
            FetchOutcome::StoreUnavailable => Reply::single(MSG_STORE_UNAVAILABLE),
        }
    }
}

impl From<&UpdateOutcome> for Reply {
    fn from(outcome: &UpdateOutcome) -> Self {
        match outcome {
            UpdateOutcome::LocationSet { radius } => Reply::single(format!(
                "Location set with radius {}.\nUse `/radius <radius>` if you want to change your search radius.",
                radius
            )),
            UpdateOutcome::UnrecognizedLocation | UpdateOutcome::NoProfile => {
                Reply::single(MSG_SET_LOCATION)
            }
            UpdateOutcome::RadiusSet(radius) => Reply::single(format!(
                "Your search radius has been set to {} meters!",
                radius
            )),
            UpdateOutcome::RadiusOutOfRange => Reply::single(radius_limits()),
            UpdateOutcome::SourceSet(source) => Reply::single(format!(
                "Your entropy source has been set to \"{}\"!",
                source
            )),
            UpdateOutcome::SourceInvalid { requested, current } => Reply::single(format!(
                "An entropy source with the name \"{}\" does not exist! Using \"{}\".\nThe following sources are available: {}",
                requested,
                current,
                available_sources()
            )),
            UpdateOutcome::StoreUnavailable => Reply::single(MSG_STORE_UNAVAILABLE),
        }
    }
}

impl From<FetchOutcome> for Reply {
    fn from(outcome: FetchOutcome) -> Self {
        Reply::from(&outcome)
    }
}

impl From<UpdateOutcome> for Reply {
    fn from(outcome: UpdateOutcome) -> Self {
        Reply::from(&outcome)
    }
}

impl FetchOutcome {
    /// Stable snake_case name of the outcome
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NoProfile => "no_profile",
            Self::RateLimited { .. } => "rate_limited",
            Self::NoResult => "no_result",
            Self::ApiError(_) => "api_error",
            Self::MissingCredential => "missing_credential",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl UpdateOutcome {
    /// Stable snake_case name of the outcome
    pub fn tag(&self) -> &'static str {
        match self {
            Self::LocationSet { .. } => "location_set",
            Self::UnrecognizedLocation => "unrecognized_location",
            Self::RadiusSet(_) => "radius_set",
            Self::RadiusOutOfRange => "radius_out_of_range",
            Self::SourceSet(_) => "source_set",
            Self::SourceInvalid { .. } => "source_invalid",
            Self::NoProfile => "no_profile",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiPoint, PointLocation};
    use crate::profile::Radius;

    fn point(point_type: i64) -> ApiPoint {
        ApiPoint {
            point_type,
            location: PointLocation {
                latitude: 29.98,
                longitude: 31.1342,
            },
            power: 2.347,
            radius: 120.0,
            z_score: -3.1234,
            distance: 1500.256,
            bearing: 87.5,
        }
    }

    #[test]
    fn test_anomaly_reply() {
        let outcome = FetchOutcome::Found(FoundPoint {
            kind: FoundKind::Anomaly,
            point: point(2),
            source: EntropySource::Temporal,
        });
        let reply = Reply::from(&outcome);

        assert_eq!(reply.lines().len(), 2);
        assert_eq!(
            reply.lines()[0],
            "Void anomaly found:\nEntropy: `temporal`\nLatitude: `29.98`\nLongitude: `31.1342`\nPower: `2.35`\nRadius: `120.00`m\nZ-score: `-3.12`\nDistance: `1500.26`m\nBearing: `87.50`°"
        );
        assert_eq!(reply.lines()[1], "@@29.98,31.1342");
    }

    #[test]
    fn test_anomaly_reply_unknown_type() {
        let outcome = FetchOutcome::Found(FoundPoint {
            kind: FoundKind::Anomaly,
            point: point(9),
            source: EntropySource::Pseudo,
        });
        let reply = Reply::from(outcome);
        assert!(reply.lines()[0].starts_with("Unknown anomaly found:"));
    }

    #[test]
    fn test_blindspot_reply() {
        let outcome = FetchOutcome::Found(FoundPoint {
            kind: FoundKind::Blindspot,
            point: point(0),
            source: EntropySource::Pseudo,
        });
        let reply = Reply::from(&outcome);

        assert_eq!(
            reply.lines()[0],
            "Blindspot found:\nEntropy: `pseudo`\nLatitude: `29.98`\nLongitude: `31.1342`\nDistance: `1500.26`m\nBearing: `87.50`°"
        );
        assert_eq!(reply.lines()[1], "geo:29.98,31.1342");
    }

    #[test]
    fn test_single_message_replies() {
        let outcomes = [
            FetchOutcome::NoProfile,
            FetchOutcome::RateLimited { wait_secs: 4 },
            FetchOutcome::NoResult,
            FetchOutcome::ApiError("boom".to_string()),
            FetchOutcome::MissingCredential,
            FetchOutcome::StoreUnavailable,
        ];
        for outcome in &outcomes {
            assert_eq!(Reply::from(outcome).lines().len(), 1, "{:?}", outcome);
        }

        assert_eq!(Reply::from(&outcomes[0]).lines()[0], MSG_SET_LOCATION);
        assert!(Reply::from(&outcomes[1]).lines()[0].contains("try again in 4 seconds"));
        assert_eq!(Reply::from(&outcomes[2]).lines()[0], MSG_NO_ANOMALY_FOUND);
        assert_eq!(Reply::from(&outcomes[3]).lines()[0], "boom");
    }

    #[test]
    fn test_update_replies() {
        let radius = Radius::new(2000).unwrap();
        assert_eq!(
            Reply::from(UpdateOutcome::LocationSet { radius }).into_inner(),
            vec!["Location set with radius 2000.\nUse `/radius <radius>` if you want to change your search radius.".to_string()]
        );
        assert_eq!(
            Reply::from(UpdateOutcome::RadiusSet(Radius::new(4500).unwrap())).lines()[0],
            "Your search radius has been set to 4500 meters!"
        );
        assert_eq!(
            Reply::from(UpdateOutcome::RadiusOutOfRange).lines()[0],
            "Please provide a radius in meters.\nMin. 1000 and max. 10000."
        );
        assert_eq!(
            Reply::from(UpdateOutcome::SourceSet(EntropySource::Pseudo)).lines()[0],
            "Your entropy source has been set to \"pseudo\"!"
        );
        assert_eq!(
            Reply::from(UpdateOutcome::NoProfile).lines()[0],
            MSG_SET_LOCATION
        );
    }

    #[test]
    fn test_source_invalid_reply_lists_sources() {
        let reply = Reply::from(UpdateOutcome::SourceInvalid {
            requested: "quantum".to_string(),
            current: EntropySource::Temporal,
        });
        assert_eq!(reply.lines().len(), 1);
        let message = &reply.lines()[0];
        assert!(message.contains("\"quantum\" does not exist"));
        assert!(message.contains("Using \"temporal\""));
        assert!(message.ends_with("available: temporal, pseudo"));
    }

    #[test]
    fn test_tags() {
        assert_eq!(FetchOutcome::NoResult.tag(), "no_result");
        assert_eq!(UpdateOutcome::RadiusOutOfRange.tag(), "radius_out_of_range");
    }

    #[test]
    fn test_reply_serializes_as_list() {
        let reply = Reply(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(serde_json::to_string(&reply).unwrap(), r#"["a","b"]"#);
    }
}
