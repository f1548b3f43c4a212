//! Application constants for Jellyfin Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for credential overrides
pub mod env {
    /// Environment variable name for the API key
    pub const API_KEY: &str = "JELLYFIN_API_KEY";

    /// Environment variable name for the user id
    pub const USER_ID: &str = "JELLYFIN_USER_ID";

    /// Environment variable name for the API endpoint
    pub const ENDPOINT: &str = "JELLYFIN_ENDPOINT";
}

/// Jellyfin REST API paths and authorization header
pub mod jellyfin {
    /// Path segment before the user id
    pub const USERS_SEGMENT: &str = "Users";

    /// Items collection path segment
    pub const ITEMS_SEGMENT: &str = "Items";

    /// Path segment after the item id of a download
    pub const DOWNLOAD_SEGMENT: &str = "Download";

    /// User id used when none is configured
    pub const DEFAULT_USER_ID: &str = "0";

    /// Authorization header name understood by Jellyfin and Emby
    pub const AUTH_HEADER: &str = "X-Emby-Authorization";

    /// Client name reported in the authorization header
    pub const CLIENT_NAME: &str = "Download Client";

    /// Device name reported in the authorization header
    pub const DEVICE_NAME: &str = "Linux";

    /// Stable device id reported in the authorization header
    pub const DEVICE_ID: &str = "PlRvNOqV9GYvBBUssdhY";

    /// Client version reported in the authorization header
    pub const CLIENT_VERSION: &str = "1.0";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Jellyfin-Fetcher/0.1.0";

    /// Default timeout for catalog requests
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Default rate limit for catalog requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;

    /// Maximum ids per metadata request
    pub const METADATA_CHUNK_SIZE: usize = 200;
}

/// Navigator limits
pub mod navigator {
    /// Maximum number of columns derived from the root
    pub const MAX_COLUMN_DEPTH: usize = 10;

    /// Maximum number of descendants one selection toggle may touch
    pub const PROPAGATION_NODE_LIMIT: usize = 50_000;

    /// Maximum folder depth walked by one selection toggle
    pub const PROPAGATION_DEPTH_LIMIT: usize = 32;

    /// Concurrent children fetches while walking a folder subtree
    pub const PROPAGATION_FETCH_CONCURRENCY: usize = 4;
}

/// Download queue behaviour
pub mod queue {
    use super::Duration;

    /// Progress tick cadence
    pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

    /// Automatic retries of a failed transfer before it is left alone
    pub const MAX_RETRIES: u32 = 2;

    /// Base delay before a failed transfer is retried
    pub const RETRY_DELAY: Duration = Duration::from_secs(30);

    /// Jitter applied to retry delays (0.0-1.0)
    pub const RETRY_JITTER_FACTOR: f64 = 0.1;

    /// Samples kept for throughput calculation
    pub const RATE_CALCULATION_WINDOW: usize = 10;

    /// Root directory for episodic items
    pub const SERIES_DIR: &str = "Series";

    /// Root directory for standalone works
    pub const FILM_DIR: &str = "Film";
}

/// File operation constants
pub mod files {
    /// Application directory under the user config dir
    pub const APP_DIR_NAME: &str = "jellyfin-fetcher";

    /// Persisted session record
    pub const SESSION_FILE_NAME: &str = "session.json";

    /// Tunables file
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Log file used while the terminal UI owns the screen
    pub const LOG_FILE_NAME: &str = "jellyfin-fetcher.log";

    /// Suffix of in-flight downloads
    pub const TEMP_FILE_SUFFIX: &str = ".part";

    /// Download root under the home directory when none is configured
    pub const DEFAULT_DOWNLOAD_DIR: &str = "Jellyfin";
}

/// Session persistence retry policy
pub mod persistence {
    use super::Duration;

    /// First retry delay for a failed session write
    pub const INITIAL_RETRY_INTERVAL: Duration = Duration::from_millis(50);

    /// Give up on a session write after this long
    pub const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(2);
}

// Re-export commonly used constants for convenience
pub use env::{API_KEY as ENV_API_KEY, ENDPOINT as ENV_ENDPOINT, USER_ID as ENV_USER_ID};
pub use files::TEMP_FILE_SUFFIX;
pub use http::{METADATA_CHUNK_SIZE, USER_AGENT};
pub use navigator::MAX_COLUMN_DEPTH;
pub use queue::TICK_INTERVAL;
