//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default search radius in meters for new profiles
pub const DEFAULT_RADIUS: u32 = 2000;

/// Default entropy source for new profiles
pub const DEFAULT_SOURCE: &str = "temporal";

/// Default API request timeout in seconds
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7878;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Profile store file name
pub const STORE_FILE_NAME: &str = "profiles.json";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "fatum";
