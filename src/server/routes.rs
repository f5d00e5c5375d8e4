//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::api::{
    available_anomaly_kinds, available_blindspot_kinds, AnomalyKind, BlindspotKind, PointApi,
};
use crate::coord::Location;
use crate::error::Error;
use crate::orchestrator::{FetchOutcome, Reply, UpdateOutcome};
use crate::profile::{EntropySource, Profile};
use crate::server::state::AppState;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/sources", get(sources_handler))
        .route("/api/users/:id", get(profile_handler))
        .route("/api/users/:id/location", put(location_handler))
        .route("/api/users/:id/radius", put(radius_handler))
        .route("/api/users/:id/source", put(source_handler))
        .route("/api/users/:id/anomaly", post(anomaly_handler))
        .route("/api/users/:id/blindspot", post(blindspot_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(code: &str, error: impl Into<String>) -> Self {
        ApiError {
            error: error.into(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidCoordinates(_) => "INVALID_COORDINATES",
            Error::InvalidRadius(_) => "INVALID_RADIUS",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        };
        ApiError::new(code, err.to_string())
    }
}

/// Parse a required JSON body
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::new("INVALID_BODY", "Missing request body"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::new("INVALID_BODY", e.to_string()))
}

/// Parse an optional JSON body, falling back to defaults when empty
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_body(body)
}

/// Workflow answer
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    /// Snake_case outcome tag
    pub outcome: String,
    /// Reply strings in send order
    pub replies: Reply,
}

impl From<UpdateOutcome> for ReplyResponse {
    fn from(outcome: UpdateOutcome) -> Self {
        ReplyResponse {
            outcome: outcome.tag().to_string(),
            replies: Reply::from(outcome),
        }
    }
}

impl From<FetchOutcome> for ReplyResponse {
    fn from(outcome: FetchOutcome) -> Self {
        ReplyResponse {
            outcome: outcome.tag().to_string(),
            replies: Reply::from(outcome),
        }
    }
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Whether an API token is configured
    pub credential_configured: bool,
    /// Number of stored profiles
    pub profiles: usize,
    /// Radius new profiles start with
    pub default_radius: u32,
    /// Entropy source new profiles start with
    pub default_source: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let orchestrator = &state.orchestrator;
    let defaults = orchestrator.defaults();

    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        credential_configured: orchestrator.api().has_credential(),
        profiles: orchestrator.store().len(),
        default_radius: defaults.radius.meters(),
        default_source: defaults.source.to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Sources list response
#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<EntropySource>,
    pub anomaly_types: Vec<AnomalyKind>,
    pub blindspot_types: Vec<BlindspotKind>,
}

/// List entropy sources and request types
///
/// GET /api/sources
async fn sources_handler() -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: EntropySource::available().to_vec(),
        anomaly_types: available_anomaly_kinds(),
        blindspot_types: available_blindspot_kinds(),
    })
}

/// Get a stored profile
///
/// GET /api/users/:id
async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, (StatusCode, Json<ApiError>)> {
    state.orchestrator.profile(&id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("NOT_FOUND", format!("No profile for user: {}", id))),
        )
    })
}

/// Location request body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LocationRequest {
    Coordinates { latitude: f64, longitude: f64 },
    /// Free text, a map link or a `lat,lon` pair
    Text { text: String },
}

/// Set the search center
///
/// PUT /api/users/:id/location
async fn location_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReplyResponse>, ApiError> {
    let req: LocationRequest = parse_body(&body)?;
    let outcome = match req {
        LocationRequest::Coordinates {
            latitude,
            longitude,
        } => {
            let location = Location::checked(latitude, longitude)?;
            state.orchestrator.set_location(&id, location).await
        }
        LocationRequest::Text { text } => {
            state.orchestrator.set_location_from_text(&id, &text).await
        }
    };

    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
pub struct RadiusRequest {
    /// Radius in meters
    pub radius: i64,
}

/// Set the search radius
///
/// PUT /api/users/:id/radius
async fn radius_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReplyResponse>, ApiError> {
    let req: RadiusRequest = parse_body(&body)?;
    let outcome = state.orchestrator.set_radius(&id, req.radius).await;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
pub struct SourceRequest {
    pub source: String,
}

/// Set the entropy source
///
/// PUT /api/users/:id/source
async fn source_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReplyResponse>, ApiError> {
    let req: SourceRequest = parse_body(&body)?;
    let outcome = state.orchestrator.set_source(&id, &req.source).await;
    Ok(Json(outcome.into()))
}

/// Fetch request body
#[derive(Debug, Default, Deserialize)]
pub struct FetchRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

fn parse_kind<T: std::str::FromStr<Err = String> + Default>(
    kind: Option<&str>,
) -> Result<T, ApiError> {
    match kind {
        Some(name) => name.parse().map_err(|e| ApiError::new("INVALID_TYPE", e)),
        None => Ok(T::default()),
    }
}

/// Fetch an anomaly
///
/// POST /api/users/:id/anomaly
async fn anomaly_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReplyResponse>, ApiError> {
    let req: FetchRequest = parse_optional_body(&body)?;
    let kind: AnomalyKind = parse_kind(req.kind.as_deref())?;
    let outcome = state.orchestrator.fetch_anomaly(&id, kind).await;
    Ok(Json(outcome.into()))
}

/// Fetch a blindspot
///
/// POST /api/users/:id/blindspot
async fn blindspot_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReplyResponse>, ApiError> {
    let req: FetchRequest = parse_optional_body(&body)?;
    let kind: BlindspotKind = parse_kind(req.kind.as_deref())?;
    let outcome = state.orchestrator.fetch_blindspot(&id, kind).await;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RandonauticaClient;
    use crate::config::Config;
    use crate::orchestrator::reply::{MSG_NO_TOKEN, MSG_SET_LOCATION};
    use crate::orchestrator::Orchestrator;
    use crate::profile::{ProfileDefaults, ProfileStore};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    fn create_test_state(base_url: &str, token: Option<&str>) -> (Arc<AppState>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(ProfileStore::open(temp_dir.path().join("profiles.json")).unwrap());
        let client = RandonauticaClient::new(
            base_url,
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap();
        let orchestrator = Orchestrator::new(store, client, ProfileDefaults::default());
        let state = AppState::with_orchestrator(Config::default(), orchestrator);
        (Arc::new(state), temp_dir)
    }

    /// Serve a fake point API on an ephemeral port
    async fn spawn_point_api() -> String {
        async fn points() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "result": {"points": [{
                    "type": 1,
                    "location": {"latitude": 52.52, "longitude": 13.405},
                    "power": 1.8, "radius": 90.0, "z_score": 2.9,
                    "distance": 640.0, "bearing": 200.0
                }]}
            }))
        }

        let app = Router::new().route("/gen/anomaly", get(points));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes)
    }

    async fn set_location(state: &Arc<AppState>, id: &str) {
        state
            .orchestrator
            .set_location(id, Location::new(52.5, 13.4))
            .await;
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        set_location(&state, "alice").await;
        let app = create_router(state);

        let (status, body) = send(app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);

        let status: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert!(status.running);
        assert!(!status.credential_configured);
        assert_eq!(status.profiles, 1);
        assert_eq!(status.default_radius, 2000);
        assert_eq!(status.default_source, "temporal");
    }

    #[tokio::test]
    async fn test_sources_endpoint() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        let app = create_router(state);

        let (status, body) = send(app, "GET", "/api/sources", None).await;
        assert_eq!(status, StatusCode::OK);

        let sources: SourcesResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(sources.sources, vec![EntropySource::Temporal, EntropySource::Pseudo]);
        assert_eq!(sources.anomaly_types.len(), 4);
        assert_eq!(sources.blindspot_types.len(), 2);
    }

    #[tokio::test]
    async fn test_profile_endpoint() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        set_location(&state, "alice").await;

        let (status, body) = send(create_router(state.clone()), "GET", "/api/users/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        let profile: Profile = serde_json::from_slice(&body).unwrap();
        assert_eq!(profile.id, "alice");
        assert_eq!(profile.radius.meters(), 2000);

        let (status, body) = send(create_router(state), "GET", "/api/users/bob", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_location_endpoint_coordinates() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        let app = create_router(state.clone());

        let body = serde_json::json!({"latitude": 28.3809, "longitude": -16.5379});
        let (status, body) = send(app, "PUT", "/api/users/alice/location", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let reply: ReplyResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply.outcome, "location_set");
        assert!(reply.replies.lines()[0].starts_with("Location set with radius 2000."));
        assert_eq!(
            state.orchestrator.profile("alice").unwrap().location,
            Location::new(28.3809, -16.5379)
        );
    }

    #[tokio::test]
    async fn test_location_endpoint_text() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);

        let body = serde_json::json!({"text": "meet me at 28.3809, -16.5379"});
        let (_, bytes) = send(create_router(state.clone()), "PUT", "/api/users/alice/location", Some(body)).await;
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "location_set");

        let body = serde_json::json!({"text": "nowhere"});
        let (status, bytes) = send(create_router(state), "PUT", "/api/users/bob/location", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "unrecognized_location");
        assert_eq!(reply.replies.lines(), [MSG_SET_LOCATION]);
    }

    #[tokio::test]
    async fn test_location_endpoint_invalid_coordinates() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        let app = create_router(state.clone());

        let body = serde_json::json!({"latitude": 91.0, "longitude": 0.0});
        let (status, bytes) = send(app, "PUT", "/api/users/alice/location", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ApiError = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(err.code, "INVALID_COORDINATES");
        assert!(state.orchestrator.profile("alice").is_none());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);

        let (status, bytes) = send(create_router(state.clone()), "PUT", "/api/users/alice/radius", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ApiError = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(err.code, "INVALID_BODY");

        let body = serde_json::json!({"radius": "far"});
        let (status, _) = send(create_router(state), "PUT", "/api/users/alice/radius", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_radius_endpoint() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        set_location(&state, "alice").await;

        let body = serde_json::json!({"radius": 5000});
        let (_, bytes) = send(create_router(state.clone()), "PUT", "/api/users/alice/radius", Some(body)).await;
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "radius_set");

        // Out of range is a reply, not a request error
        let body = serde_json::json!({"radius": 50});
        let (status, bytes) = send(create_router(state.clone()), "PUT", "/api/users/alice/radius", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "radius_out_of_range");

        assert_eq!(state.orchestrator.profile("alice").unwrap().radius.meters(), 5000);
    }

    #[tokio::test]
    async fn test_source_endpoint() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        set_location(&state, "alice").await;

        let body = serde_json::json!({"source": "PSEUDO"});
        let (_, bytes) = send(create_router(state.clone()), "PUT", "/api/users/alice/source", Some(body)).await;
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "source_set");

        let body = serde_json::json!({"source": "cosmic"});
        let (_, bytes) = send(create_router(state.clone()), "PUT", "/api/users/alice/source", Some(body)).await;
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "source_invalid");
        assert_eq!(reply.replies.lines().len(), 1);

        assert_eq!(
            state.orchestrator.profile("alice").unwrap().source,
            EntropySource::Pseudo
        );
    }

    #[tokio::test]
    async fn test_anomaly_endpoint_without_profile() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", Some("secret"));
        let app = create_router(state);

        let (status, bytes) = send(app, "POST", "/api/users/alice/anomaly", None).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "no_profile");
    }

    #[tokio::test]
    async fn test_blindspot_endpoint_without_token() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", None);
        set_location(&state, "alice").await;
        let app = create_router(state);

        let body = serde_json::json!({"type": "pseudo"});
        let (_, bytes) = send(app, "POST", "/api/users/alice/blindspot", Some(body)).await;
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "missing_credential");
        assert_eq!(reply.replies.lines(), [MSG_NO_TOKEN]);
    }

    #[tokio::test]
    async fn test_anomaly_endpoint_unknown_type() {
        let (state, _temp) = create_test_state("http://127.0.0.1:9", Some("secret"));
        set_location(&state, "alice").await;
        let app = create_router(state);

        let body = serde_json::json!({"type": "vortex"});
        let (status, bytes) = send(app, "POST", "/api/users/alice/anomaly", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ApiError = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(err.code, "INVALID_TYPE");
    }

    #[tokio::test]
    async fn test_anomaly_endpoint_found() {
        let base = spawn_point_api().await;
        let (state, _temp) = create_test_state(&base, Some("secret"));
        set_location(&state, "alice").await;

        let body = serde_json::json!({"type": "attractor"});
        let (status, bytes) = send(create_router(state.clone()), "POST", "/api/users/alice/anomaly", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "found");
        assert_eq!(reply.replies.lines()[1], "@@52.52,13.405");

        // The second request inside the window is refused
        let (_, bytes) = send(create_router(state), "POST", "/api/users/alice/anomaly", None).await;
        let reply: ReplyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.outcome, "rate_limited");
    }
}
