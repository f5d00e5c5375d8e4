//! Request orchestration
//!
//! Composes the profile store, the rate limiter and the point API into the
//! user-facing workflows. Every workflow returns a tagged outcome; nothing is
//! surfaced to the caller as an error. Outcomes render to reply strings via
//! [`reply::Reply`].
//!
//! All workflows for one user id are serialized by a per-user async lock, so
//! a rate-limit check-and-record and a temporary source override are never
//! interleaved with another request of the same user.

pub mod reply;


use crate::api::{
    AnomalyKind, ApiPoint, ApiResponse, BlindspotKind, Endpoint, PointApi, PointQuery,
    RandonauticaClient,
};
use crate::config::Config;
use crate::constants::api::NO_RESULT_STATUS;
use crate::coord::{self, Location};
use crate::error::{Error, Result};
use crate::limiter::{Clock, Gate, RateLimiter, SystemClock};
use crate::profile::{EntropySource, Profile, ProfileDefaults, ProfileField, ProfileStore, Radius};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub use reply::Reply;

/// Outcome of a settings workflow
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Location stored; `radius` is the default radius announced to the user
    LocationSet { radius: Radius },
    /// Text did not contain usable coordinates
    UnrecognizedLocation,
    RadiusSet(Radius),
    RadiusOutOfRange,
    SourceSet(EntropySource),
    SourceInvalid {
        requested: String,
        current: EntropySource,
    },
    NoProfile,
    /// The profile store could not be written
    StoreUnavailable,
}

/// Which fetch produced a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoundKind {
    Anomaly,
    Blindspot,
}

/// A successfully fetched point
#[derive(Debug, Clone, PartialEq)]
pub struct FoundPoint {
    pub kind: FoundKind,
    pub point: ApiPoint,
    /// Entropy source the request was made with
    pub source: EntropySource,
}

/// Outcome of a fetch workflow
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(FoundPoint),
    NoProfile,
    RateLimited { wait_secs: i64 },
    /// The service found no qualifying anomaly
    NoResult,
    /// Error text from the service or the transport, shown verbatim
    ApiError(String),
    MissingCredential,
    /// The profile store could not be written
    StoreUnavailable,
}

/// Temporarily replaces a profile's entropy source
///
/// Callers restore explicitly with [`SourceOverride::restore`]; dropping an
/// unrestored override (cancellation of the surrounding future) restores it
/// as well. Either way the in-memory profile holds the original source again,
/// even when the store write fails.
struct SourceOverride<'a> {
    store: &'a ProfileStore,
    id: String,
    original: EntropySource,
    restored: bool,
}

impl<'a> SourceOverride<'a> {
    /// Persist `source` as the active source; `None` if nothing had to change
    fn acquire(
        store: &'a ProfileStore,
        profile: &Profile,
        source: EntropySource,
    ) -> Result<Option<Self>> {
        if profile.source == source {
            return Ok(None);
        }
        if !store.set_field(&profile.id, ProfileField::Source(source))? {
            return Ok(None);
        }
        debug!(user = %profile.id, from = %profile.source, to = %source, "source overridden");
        Ok(Some(Self {
            store,
            id: profile.id.clone(),
            original: profile.source,
            restored: false,
        }))
    }

    /// Put the original source back
    fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.store
            .force_field(&self.id, ProfileField::Source(self.original))?;
        debug!(user = %self.id, source = %self.original, "source restored");
        Ok(())
    }
}

impl Drop for SourceOverride<'_> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        match self.store.force_field(&self.id, ProfileField::Source(self.original)) {
            Ok(_) => debug!(user = %self.id, source = %self.original, "source restored on drop"),
            Err(e) => error!(user = %self.id, "failed to persist restored entropy source: {}", e),
        }
    }
}

type UserLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Holds a user's workflow lock and prunes unused map entries on release
struct UserGuard<'a> {
    locks: &'a UserLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts
        self.guard.take();

        // Holders and waiters keep a clone; a count of one means only the map is left
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// The user-facing workflows
pub struct Orchestrator<A> {
    store: Arc<ProfileStore>,
    limiter: RateLimiter,
    api: A,
    defaults: ProfileDefaults,
    user_locks: UserLocks,
}

impl Orchestrator<RandonauticaClient> {
    /// Open the configured profile store and connect to the configured API
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(ProfileStore::open(config.store_path()?)?);
        let api = RandonauticaClient::from_config(config)?;
        Ok(Self::new(store, api, config.profile_defaults()?))
    }
}

impl<A: PointApi> Orchestrator<A> {
    /// Create an orchestrator using the wall clock
    pub fn new(store: Arc<ProfileStore>, api: A, defaults: ProfileDefaults) -> Self {
        Self::with_clock(store, api, defaults, Arc::new(SystemClock))
    }

    /// Create an orchestrator with a specific clock
    pub fn with_clock(
        store: Arc<ProfileStore>,
        api: A,
        defaults: ProfileDefaults,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if !api.has_credential() {
            warn!("no API token configured; fetches will be refused");
        }

        Self {
            limiter: RateLimiter::new(store.clone(), clock),
            store,
            api,
            defaults,
            user_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The profile store
    pub fn store(&self) -> &Arc<ProfileStore> {
        &self.store
    }

    /// The point API
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Defaults applied to new profiles
    pub fn defaults(&self) -> ProfileDefaults {
        self.defaults
    }

    /// Current profile of `id`
    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.store.get(id)
    }

    async fn lock_user(&self, id: &str) -> UserGuard<'_> {
        let user_lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id.to_string()).or_default().clone()
        };
        let guard = user_lock.lock_owned().await;
        UserGuard {
            locks: &self.user_locks,
            guard: Some(guard),
        }
    }

    /// Store the search center, creating the profile on first use
    ///
    /// Out-of-range coordinates are rejected without touching the store.
    pub async fn set_location(&self, id: &str, location: Location) -> UpdateOutcome {
        if let Err(e) = location.validate() {
            debug!(user = id, "rejected location: {}", e);
            return UpdateOutcome::UnrecognizedLocation;
        }

        let _guard = self.lock_user(id).await;

        match self
            .store
            .create_or_update_location(id, location, self.defaults)
        {
            Ok(_) => {
                info!(user = id, %location, "location set");
                UpdateOutcome::LocationSet {
                    radius: self.defaults.radius,
                }
            }
            Err(e) => {
                error!(user = id, "failed to store location: {}", e);
                UpdateOutcome::StoreUnavailable
            }
        }
    }

    /// Extract coordinates from chat text and store them as the search center
    pub async fn set_location_from_text(&self, id: &str, text: &str) -> UpdateOutcome {
        let location = coord::parse(text).map(|raw| raw.to_location());

        match location {
            Some(Ok(location)) => self.set_location(id, location).await,
            Some(Err(e)) => {
                debug!(user = id, "rejected location text: {}", e);
                UpdateOutcome::UnrecognizedLocation
            }
            None => UpdateOutcome::UnrecognizedLocation,
        }
    }

    /// Change the search radius
    pub async fn set_radius(&self, id: &str, meters: i64) -> UpdateOutcome {
        let Some(radius) = u32::try_from(meters)
            .ok()
            .and_then(|m| Radius::new(m).ok())
        else {
            return UpdateOutcome::RadiusOutOfRange;
        };

        let _guard = self.lock_user(id).await;

        match self.store.set_field(id, ProfileField::Radius(radius)) {
            Ok(true) => {
                info!(user = id, %radius, "radius set");
                UpdateOutcome::RadiusSet(radius)
            }
            Ok(false) => UpdateOutcome::NoProfile,
            Err(e) => {
                error!(user = id, "failed to store radius: {}", e);
                UpdateOutcome::StoreUnavailable
            }
        }
    }

    /// Change the entropy source
    pub async fn set_source(&self, id: &str, source: &str) -> UpdateOutcome {
        let _guard = self.lock_user(id).await;

        let Ok(parsed) = source.parse::<EntropySource>() else {
            return match self.store.get(id) {
                Some(profile) => UpdateOutcome::SourceInvalid {
                    requested: source.to_string(),
                    current: profile.source,
                },
                None => UpdateOutcome::NoProfile,
            };
        };

        match self.store.set_field(id, ProfileField::Source(parsed)) {
            Ok(true) => {
                info!(user = id, source = %parsed, "source set");
                UpdateOutcome::SourceSet(parsed)
            }
            Ok(false) => UpdateOutcome::NoProfile,
            Err(e) => {
                error!(user = id, "failed to store source: {}", e);
                UpdateOutcome::StoreUnavailable
            }
        }
    }

    /// Fetch an anomaly around the user's location
    pub async fn fetch_anomaly(&self, id: &str, kind: AnomalyKind) -> FetchOutcome {
        let _guard = self.lock_user(id).await;
        let span = info_span!("fetch", user = id, endpoint = "anomaly", request_id = %Uuid::new_v4());

        async {
            let profile = match self.admit(id) {
                Ok(profile) => profile,
                Err(outcome) => return outcome,
            };

            let query = PointQuery {
                location: profile.location,
                radius: profile.radius,
                source: profile.source,
                kind: Some(kind),
            };
            let response = self.call(Endpoint::Anomaly, &query).await;

            match response {
                Ok(ApiResponse::Points { result }) => match result.points.into_iter().next() {
                    Some(point) => {
                        info!(kind = %kind, "anomaly found");
                        FetchOutcome::Found(FoundPoint {
                            kind: FoundKind::Anomaly,
                            point,
                            source: profile.source,
                        })
                    }
                    None => FetchOutcome::NoResult,
                },
                Ok(ApiResponse::Failure {
                    status: NO_RESULT_STATUS,
                    ..
                }) => {
                    info!("no anomaly found");
                    FetchOutcome::NoResult
                }
                Ok(ApiResponse::Failure { status, error }) => {
                    warn!(status, "API returned an error");
                    FetchOutcome::ApiError(error)
                }
                Err(e) => Self::call_failed(e),
            }
        }
        .instrument(span)
        .await
    }

    /// Fetch a blindspot around the user's location
    ///
    /// `BlindspotKind::Pseudo` switches the profile to pseudo entropy for this
    /// one request only.
    pub async fn fetch_blindspot(&self, id: &str, kind: BlindspotKind) -> FetchOutcome {
        let _guard = self.lock_user(id).await;
        let span = info_span!("fetch", user = id, endpoint = "blindspot", request_id = %Uuid::new_v4());

        async {
            let profile = match self.admit(id) {
                Ok(profile) => profile,
                Err(outcome) => return outcome,
            };

            let source = match kind {
                BlindspotKind::Pseudo => EntropySource::Pseudo,
                BlindspotKind::Quantum => profile.source,
            };

            let source_override = match SourceOverride::acquire(&self.store, &profile, source) {
                Ok(source_override) => source_override,
                Err(e) => {
                    warn!("could not persist source override: {}", e);
                    None
                }
            };

            let query = PointQuery {
                location: profile.location,
                radius: profile.radius,
                source,
                kind: None,
            };
            let response = self.call(Endpoint::Blindspot, &query).await;

            if let Some(source_override) = source_override {
                if let Err(e) = source_override.restore() {
                    error!("failed to persist restored entropy source: {}", e);
                    return FetchOutcome::StoreUnavailable;
                }
            }

            match response {
                Ok(ApiResponse::Points { result }) => match result.points.into_iter().next() {
                    Some(point) => {
                        info!(%source, "blindspot found");
                        FetchOutcome::Found(FoundPoint {
                            kind: FoundKind::Blindspot,
                            point,
                            source,
                        })
                    }
                    None => FetchOutcome::ApiError(reply::MSG_NO_POINTS.to_string()),
                },
                Ok(ApiResponse::Failure { status, error }) => {
                    warn!(status, "API returned an error");
                    FetchOutcome::ApiError(error)
                }
                Err(e) => Self::call_failed(e),
            }
        }
        .instrument(span)
        .await
    }

    /// Profile, credential and rate-limit checks shared by both fetches
    fn admit(&self, id: &str) -> std::result::Result<Profile, FetchOutcome> {
        let Some(profile) = self.store.get(id) else {
            debug!("no profile");
            return Err(FetchOutcome::NoProfile);
        };

        if !self.api.has_credential() {
            warn!("no API token configured; refusing to call the API");
            return Err(FetchOutcome::MissingCredential);
        }

        match self.limiter.check_and_record(id) {
            Ok(Gate::Allowed) => Ok(profile),
            Ok(Gate::Denied { wait_secs }) => {
                warn!(wait_secs, "rate limited");
                Err(FetchOutcome::RateLimited { wait_secs })
            }
            Err(e) => {
                error!("rate limiter failed: {}", e);
                Err(FetchOutcome::StoreUnavailable)
            }
        }
    }

    /// Issue the API call with an upper bound on its duration
    async fn call(&self, endpoint: Endpoint, query: &PointQuery) -> Result<ApiResponse> {
        let timeout = self.api.timeout();
        debug!(?endpoint, query = %query.to_query_string(), "calling API");

        match tokio::time::timeout(timeout, self.api.fetch(endpoint, query)).await {
            Ok(response) => response,
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    fn call_failed(err: Error) -> FetchOutcome {
        warn!("API call failed: {}", err);
        match err {
            Error::MissingCredential => FetchOutcome::MissingCredential,
            Error::Transport(message) => FetchOutcome::ApiError(message),
            other => FetchOutcome::ApiError(other.to_string()),
        }
    }
}
