//! Daemon configuration
//!
//! Values are layered with figment: built-in defaults, then the TOML file,
//! then `VARKEN_`-prefixed environment variables (`__` separates nesting,
//! e.g. `VARKEN_PROMETHEUS__PORT=9100`).

use std::collections::HashSet;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub mod defaults;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    /// Push sink; omitted means no InfluxDB writes
    pub influxdb: Option<InfluxConfig>,
    /// Pull sink; omitted means no /metrics endpoint
    pub prometheus: Option<PrometheusConfig>,
    #[serde(default)]
    pub sonarr: Vec<SonarrServer>,
    #[serde(default)]
    pub radarr: Vec<RadarrServer>,
    #[serde(default)]
    pub overseerr: Vec<OverseerrServer>,
    #[serde(default)]
    pub tautulli: Vec<TautulliServer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Per-request timeout for every polled API
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_url")]
    pub url: String,
    #[serde(default = "default_influx_port")]
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub verify_ssl: bool,
    /// 1 for InfluxDB 1.x, 2 for 2.x
    #[serde(default = "default_influx_version")]
    pub version: u8,
    #[serde(default = "default_influx_username")]
    pub username: String,
    #[serde(default = "default_influx_password")]
    pub password: String,
    #[serde(default = "default_influx_database")]
    pub database: String,
    #[serde(default)]
    pub org: String,
    #[serde(default = "default_influx_database")]
    pub bucket: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_prometheus_address")]
    pub address: String,
    #[serde(default = "default_prometheus_port")]
    pub port: u16,
    #[serde(default = "default_prometheus_prefix")]
    pub prefix: String,
}

/// Connection settings shared by every polled server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConnection {
    pub id: u32,
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub verify_ssl: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarrServer {
    #[serde(flatten)]
    pub connection: ServerConnection,
    /// Days back to look for missing episodes; 0 disables the poller
    #[serde(default = "default_missing_days")]
    pub missing_days: i64,
    #[serde(default = "default_run_seconds")]
    pub missing_days_run_seconds: u64,
    /// Days ahead to look for upcoming episodes; 0 disables the poller
    #[serde(default = "default_future_days")]
    pub future_days: i64,
    #[serde(default = "default_run_seconds")]
    pub future_days_run_seconds: u64,
    #[serde(default = "default_true")]
    pub queue: bool,
    #[serde(default = "default_run_seconds")]
    pub queue_run_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarrServer {
    #[serde(flatten)]
    pub connection: ServerConnection,
    #[serde(default = "default_true")]
    pub get_missing: bool,
    #[serde(default = "default_run_seconds")]
    pub get_missing_run_seconds: u64,
    #[serde(default = "default_true")]
    pub queue: bool,
    #[serde(default = "default_run_seconds")]
    pub queue_run_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverseerrServer {
    #[serde(flatten)]
    pub connection: ServerConnection,
    #[serde(default = "default_true")]
    pub get_request_total_counts: bool,
    #[serde(default = "default_run_seconds")]
    pub request_total_run_seconds: u64,
    /// 0 disables the latest-requests poller
    #[serde(default = "default_latest_requests")]
    pub num_latest_requests_to_fetch: u32,
    #[serde(default = "default_run_seconds")]
    pub num_latest_requests_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TautulliServer {
    #[serde(flatten)]
    pub connection: ServerConnection,
    #[serde(default = "default_true")]
    pub get_activity: bool,
    #[serde(default = "default_run_seconds")]
    pub get_activity_run_seconds: u64,
    #[serde(default = "default_true")]
    pub get_stats: bool,
    #[serde(default = "default_run_seconds")]
    pub get_stats_run_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_seconds() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

fn default_influx_url() -> String {
    DEFAULT_INFLUX_URL.to_string()
}

fn default_influx_port() -> u16 {
    DEFAULT_INFLUX_PORT
}

fn default_influx_version() -> u8 {
    DEFAULT_INFLUX_VERSION
}

fn default_influx_username() -> String {
    DEFAULT_INFLUX_USERNAME.to_string()
}

fn default_influx_password() -> String {
    DEFAULT_INFLUX_PASSWORD.to_string()
}

fn default_influx_database() -> String {
    DEFAULT_INFLUX_DATABASE.to_string()
}

fn default_prometheus_address() -> String {
    DEFAULT_PROMETHEUS_ADDRESS.to_string()
}

fn default_prometheus_port() -> u16 {
    DEFAULT_PROMETHEUS_PORT
}

fn default_prometheus_prefix() -> String {
    DEFAULT_PROMETHEUS_PREFIX.to_string()
}

fn default_run_seconds() -> u64 {
    DEFAULT_RUN_SECONDS
}

fn default_missing_days() -> i64 {
    DEFAULT_MISSING_DAYS
}

fn default_future_days() -> i64 {
    DEFAULT_FUTURE_DAYS
}

fn default_latest_requests() -> u32 {
    DEFAULT_LATEST_REQUESTS
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            port: DEFAULT_INFLUX_PORT,
            ssl: false,
            verify_ssl: false,
            version: DEFAULT_INFLUX_VERSION,
            username: default_influx_username(),
            password: default_influx_password(),
            database: default_influx_database(),
            org: String::new(),
            bucket: default_influx_database(),
            token: String::new(),
        }
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_prometheus_address(),
            port: DEFAULT_PROMETHEUS_PORT,
            prefix: default_prometheus_prefix(),
        }
    }
}

impl GlobalConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Config {
    /// Load from `path` layered over defaults and the environment
    pub fn load_from_file(path: &str) -> AppResult<Self> {
        Self::extract(Self::figment().merge(Toml::file(path)).merge(Self::env()))
    }

    /// Load from an in-memory TOML document, without environment overrides
    pub fn load_from_str(toml: &str) -> AppResult<Self> {
        Self::extract(Self::figment().merge(Toml::string(toml)))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn env() -> Env {
        Env::prefixed(DEFAULT_ENV_PREFIX).split("__")
    }

    fn extract(figment: Figment) -> AppResult<Self> {
        let config: Config = figment
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no collector or sink could be built from
    pub fn validate(&self) -> AppResult<()> {
        if self.global.request_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "global.request_timeout_seconds must be greater than zero",
            ));
        }

        if let Some(influx) = &self.influxdb {
            match influx.version {
                1 => {}
                2 => {
                    if influx.org.is_empty() || influx.bucket.is_empty() || influx.token.is_empty()
                    {
                        return Err(AppError::configuration(
                            "influxdb version 2 requires org, bucket and token",
                        ));
                    }
                }
                other => {
                    return Err(AppError::configuration(format!(
                        "influxdb.version must be 1 or 2, got {other}"
                    )));
                }
            }
        }

        for server in &self.sonarr {
            for (key, days) in [
                ("missing_days", server.missing_days),
                ("future_days", server.future_days),
            ] {
                if !(0..=MAX_CALENDAR_DAYS).contains(&days) {
                    return Err(AppError::configuration(format!(
                        "sonarr server {} {key} must be between 0 and {MAX_CALENDAR_DAYS}, got {days}",
                        server.connection.id
                    )));
                }
            }
        }

        validate_servers(
            "sonarr",
            self.sonarr.iter().map(|s| {
                (
                    &s.connection,
                    vec![
                        (s.missing_days > 0, s.missing_days_run_seconds),
                        (s.future_days > 0, s.future_days_run_seconds),
                        (s.queue, s.queue_run_seconds),
                    ],
                )
            }),
        )?;
        validate_servers(
            "radarr",
            self.radarr.iter().map(|s| {
                (
                    &s.connection,
                    vec![
                        (s.get_missing, s.get_missing_run_seconds),
                        (s.queue, s.queue_run_seconds),
                    ],
                )
            }),
        )?;
        validate_servers(
            "overseerr",
            self.overseerr.iter().map(|s| {
                (
                    &s.connection,
                    vec![
                        (s.get_request_total_counts, s.request_total_run_seconds),
                        (
                            s.num_latest_requests_to_fetch > 0,
                            s.num_latest_requests_seconds,
                        ),
                    ],
                )
            }),
        )?;
        validate_servers(
            "tautulli",
            self.tautulli.iter().map(|s| {
                (
                    &s.connection,
                    vec![
                        (s.get_activity, s.get_activity_run_seconds),
                        (s.get_stats, s.get_stats_run_seconds),
                    ],
                )
            }),
        )?;
        Ok(())
    }
}

fn validate_servers<'a>(
    service: &str,
    servers: impl Iterator<Item = (&'a ServerConnection, Vec<(bool, u64)>)>,
) -> AppResult<()> {
    let mut seen = HashSet::new();
    for (connection, schedules) in servers {
        if !seen.insert(connection.id) {
            return Err(AppError::configuration(format!(
                "duplicate {service} server id {}",
                connection.id
            )));
        }
        if connection.url.trim().is_empty() {
            return Err(AppError::configuration(format!(
                "{service} server {} has no url",
                connection.id
            )));
        }
        if connection.api_key.trim().is_empty() {
            return Err(AppError::configuration(format!(
                "{service} server {} has no api_key",
                connection.id
            )));
        }
        if schedules
            .iter()
            .any(|(enabled, seconds)| *enabled && *seconds == 0)
        {
            return Err(AppError::configuration(format!(
                "{service} server {} has an enabled poller with a zero interval",
                connection.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [influxdb]
        url = "influx.lan"

        [prometheus]
        port = 9100

        [[sonarr]]
        id = 1
        url = "sonarr.lan:8989"
        api_key = "abc"
        missing_days = 0

        [[tautulli]]
        id = 1
        url = "tautulli.lan"
        api_key = "def"
        get_stats = false
    "#;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert!(config.influxdb.is_none());
        assert!(config.prometheus.is_none());
        assert!(config.sonarr.is_empty());
        assert_eq!(
            config.global.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn test_sample_document() {
        let config = Config::load_from_str(SAMPLE).unwrap();

        let influx = config.influxdb.unwrap();
        assert_eq!(influx.url, "influx.lan");
        assert_eq!(influx.port, DEFAULT_INFLUX_PORT);
        assert_eq!(influx.version, 1);

        let prometheus = config.prometheus.unwrap();
        assert_eq!(prometheus.port, 9100);
        assert_eq!(prometheus.prefix, "varken");

        let sonarr = &config.sonarr[0];
        assert_eq!(sonarr.connection.id, 1);
        assert_eq!(sonarr.missing_days, 0);
        assert_eq!(sonarr.future_days, DEFAULT_FUTURE_DAYS);
        assert!(sonarr.queue);

        assert!(!config.tautulli[0].get_stats);
        assert!(config.tautulli[0].get_activity);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let toml = r#"
            [[radarr]]
            id = 1
            url = "a"
            api_key = "k"

            [[radarr]]
            id = 1
            url = "b"
            api_key = "k"
        "#;
        let err = Config::load_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate radarr server id 1"));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let toml = r#"
            [[overseerr]]
            id = 2
            url = "requests.lan"
            api_key = ""
        "#;
        assert!(Config::load_from_str(toml).is_err());
    }

    #[test]
    fn test_zero_interval_only_matters_when_enabled() {
        let disabled = r#"
            [[radarr]]
            id = 1
            url = "a"
            api_key = "k"
            queue = false
            queue_run_seconds = 0
        "#;
        assert!(Config::load_from_str(disabled).is_ok());

        let enabled = disabled.replace("queue = false", "queue = true");
        assert!(Config::load_from_str(&enabled).is_err());
    }

    #[test]
    fn test_influx_v2_requires_token() {
        let toml = r#"
            [influxdb]
            version = 2
            org = "home"
        "#;
        assert!(Config::load_from_str(toml).is_err());
    }

    #[test]
    fn test_example_config_loads() {
        let config = Config::load_from_str(include_str!("../../varken.example.toml")).unwrap();
        assert_eq!(config.sonarr.len(), 1);
        assert_eq!(config.radarr.len(), 1);
        assert_eq!(config.overseerr.len(), 1);
        assert_eq!(config.tautulli[0].get_activity_run_seconds, 30);
        assert_eq!(config.prometheus.map(|p| p.port), Some(9595));
    }

    #[test]
    fn test_calendar_days_are_bounded() {
        for days in ["-1", "3651", "9223372036854775807"] {
            let toml = format!(
                r#"
                [[sonarr]]
                id = 1
                url = "sonarr.lan"
                api_key = "k"
                missing_days = {days}
                "#
            );
            let err = Config::load_from_str(&toml).unwrap_err();
            assert!(err.to_string().contains("missing_days must be between 0 and 3650"));
        }

        let toml = r#"
            [[sonarr]]
            id = 1
            url = "sonarr.lan"
            api_key = "k"
            future_days = 3650
        "#;
        assert!(Config::load_from_str(toml).is_ok());
    }
}
