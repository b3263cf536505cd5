//! Application constants for delta_fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Save-state format and persistence constants
pub mod savestate {
    /// Major component of the persisted save-state format version
    pub const FORMAT_MAJOR: u64 = 1;

    /// Minor component of the persisted save-state format version
    pub const FORMAT_MINOR: u64 = 0;

    /// Patch component of the persisted save-state format version
    pub const FORMAT_PATCH: u64 = 0;

    /// Suffix appended to the plugin name to form its save-state file name
    pub const FILE_SUFFIX: &str = "_save.json";
}

/// Timestamp rendering constants
pub mod time {
    /// Compact timestamp format used throughout the persisted record
    ///
    /// Renders as `YYYYMMDDThhmmss.ffffffZ` with microsecond precision.
    pub const COMPACT_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";
}

/// Download behavior constants
pub mod download {
    /// Suffix appended to a target file name on collision, repeatedly,
    /// until a non-existing name is found
    pub const COLLISION_SUFFIX: &str = "_d";

    /// Temporary file suffix for atomic write operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Maximum retry attempts for a single item's transport failure
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff between retries (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "delta-fetcher/0.1.0";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in the pool
    pub const POOL_MAX_PER_HOST: usize = 16;

    /// Default rate limit for requests against a plugin host (per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 15;
}

/// Worker and concurrency configuration
pub mod workers {
    /// Worker count used when the available parallelism cannot be queried
    pub const FALLBACK_WORKER_COUNT: usize = 4;

    /// Channel buffer size for progress reporting
    pub const PROGRESS_CHANNEL_CAPACITY: usize = 100;
}

/// Directory layout beneath the main working directory
pub mod paths {
    /// Staging area for in-progress downloads, one subdirectory per plugin
    pub const TEMP_DIR_NAME: &str = "temp";

    /// Permanent download area, one subdirectory per plugin
    pub const DOWNLOAD_DIR_NAME: &str = "downloads";

    /// Save-state files, one per plugin
    pub const SAVESTATE_DIR_NAME: &str = "savestates";

    /// Configuration file name, looked up under the user config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Application subdirectory under the user config directory
    pub const APP_DIR_NAME: &str = "delta_fetcher";
}

/// Engine-level plugin option keys
pub mod options {
    /// Courtesy delay after each successful write, in float seconds
    pub const DELAY_KEY: &str = "delay";

    /// Per-plugin override of the download concurrency limit
    pub const CONCURRENCY_KEY: &str = "concurrency";
}

// Re-export commonly used constants for convenience
pub use download::{COLLISION_SUFFIX, MAX_RETRIES, RETRY_BASE_DELAY_MS};
pub use http::{DEFAULT_RATE_LIMIT_RPS, DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use savestate::FILE_SUFFIX as SAVESTATE_FILE_SUFFIX;
pub use time::COMPACT_FORMAT as COMPACT_TIME_FORMAT;
pub use workers::FALLBACK_WORKER_COUNT;
