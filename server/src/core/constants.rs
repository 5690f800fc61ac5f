// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "courier";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "courier.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "COURIER_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "COURIER_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "COURIER_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "COURIER_LOG";

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "COURIER_DEBUG";

// =============================================================================
// Environment Variables - Datastore
// =============================================================================

/// Environment variable for datastore backend selection
pub const ENV_DATASTORE_BACKEND: &str = "COURIER_DATASTORE_BACKEND";

/// Environment variable for the Redis address (host:port)
pub const ENV_REDIS_ADDR: &str = "COURIER_REDIS_ADDR";

/// Environment variable for the Redis database index
pub const ENV_REDIS_DB: &str = "COURIER_REDIS_DB";

/// Environment variable for the Redis password
pub const ENV_REDIS_PASSWORD: &str = "COURIER_REDIS_PASSWORD";

// =============================================================================
// Environment Variables - Background Tasks
// =============================================================================

/// Environment variable for the deadline sweep interval (milliseconds)
pub const ENV_SWEEP_INTERVAL_MS: &str = "COURIER_SWEEP_INTERVAL_MS";

/// Environment variable for the push delivery interval (milliseconds)
pub const ENV_PUSH_INTERVAL_MS: &str = "COURIER_PUSH_INTERVAL_MS";

/// Environment variable for the push delivery batch size
pub const ENV_PUSH_BATCH: &str = "COURIER_PUSH_BATCH";

/// Environment variable to disable push delivery
pub const ENV_NO_PUSH: &str = "COURIER_NO_PUSH";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8085;

/// Maximum request body size in bytes
pub const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

// =============================================================================
// Broker Defaults
// =============================================================================

/// Default ack deadline in seconds when a subscription does not set one
pub const DEFAULT_ACK_DEADLINE_SECS: u64 = 10;

/// Minimum ack deadline in seconds
pub const MIN_ACK_DEADLINE_SECS: u64 = 1;

/// Default deadline sweep interval in milliseconds.
/// Half the minimum ack deadline, to bound redelivery latency.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 500;

/// Default push delivery tick interval in milliseconds
pub const DEFAULT_PUSH_INTERVAL_MS: u64 = 1000;

/// Default push delivery batch size per subscription per tick
pub const DEFAULT_PUSH_BATCH: usize = 16;

// =============================================================================
// Shutdown
// =============================================================================

/// Seconds to wait for background tasks during graceful shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Validation
// =============================================================================

/// Maximum length for topic and subscription names
pub const MAX_RESOURCE_NAME_LENGTH: usize = 255;
