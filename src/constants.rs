//! Centralized constants for the fatum crate
//!
//! Values shared by the profile model, the rate limiter and the API client.

/// Profile limits
pub mod profile {
    /// Smallest search radius a profile may hold, in meters
    pub const RADIUS_MIN: u32 = 1000;

    /// Largest search radius a profile may hold, in meters
    pub const RADIUS_MAX: u32 = 10_000;
}

/// Rate limiting
pub mod limits {
    /// Minimum interval between two fetches of the same user, in seconds
    pub const REQUEST_WINDOW_SECS: i64 = 10;
}

/// External API
pub mod api {
    /// Randonautica API base URL
    pub const RANDONAUTICA_URL: &str = "https://api.randonautica.com/v1";

    /// Anomaly generation path
    pub const ANOMALY_PATH: &str = "/gen/anomaly";

    /// Blindspot generation path
    pub const BLINDSPOT_PATH: &str = "/gen/blindspot";

    /// Status code the API uses to say no anomaly qualified
    pub const NO_RESULT_STATUS: u16 = 418;

    /// Environment variable that overrides the configured API token
    pub const TOKEN_ENV_VAR: &str = "FATUM_API_TOKEN";
}

/// Reply tags for machine-readable coordinates
pub mod tags {
    /// Prefix of the coordinate line in anomaly replies
    pub const ANOMALY: &str = "@@";

    /// Prefix of the coordinate line in blindspot replies
    pub const BLINDSPOT: &str = "geo:";
}
