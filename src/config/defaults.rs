/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Global defaults
pub const DEFAULT_CONFIG_FILE: &str = "varken.toml";
pub const DEFAULT_ENV_PREFIX: &str = "VARKEN_";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;

// InfluxDB defaults
pub const DEFAULT_INFLUX_URL: &str = "localhost";
pub const DEFAULT_INFLUX_PORT: u16 = 8086;
pub const DEFAULT_INFLUX_VERSION: u8 = 1;
pub const DEFAULT_INFLUX_USERNAME: &str = "root";
pub const DEFAULT_INFLUX_PASSWORD: &str = "root";
pub const DEFAULT_INFLUX_DATABASE: &str = "varken";

// Prometheus defaults
pub const DEFAULT_PROMETHEUS_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PROMETHEUS_PORT: u16 = 9595;
pub const DEFAULT_PROMETHEUS_PREFIX: &str = "varken";

// Poller defaults
pub const DEFAULT_RUN_SECONDS: u64 = 300;
pub const DEFAULT_MISSING_DAYS: i64 = 7;
pub const DEFAULT_FUTURE_DAYS: i64 = 1;
pub const MAX_CALENDAR_DAYS: i64 = 3650;
pub const DEFAULT_LATEST_REQUESTS: u32 = 10;
pub const DEFAULT_QUEUE_PAGE_SIZE: u32 = 250;
