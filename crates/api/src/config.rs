//! Environment-driven configuration.
//!
//! Both config structs parse through a lookup closure so tests can feed
//! values without touching the process environment. Unset keys take their
//! defaults; a present but unparsable value is a [`ConfigError`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse `key` with `FromStr`, falling back to `default` when unset or blank.
fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(value) if !value.is_empty() => {
            value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining background tasks at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cors_origins = string_or(&lookup, "CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: string_or(&lookup, "HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 3000)?,
            cors_origins,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Dashboard behaviour: where the scraper lives and how the view refreshes.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Scraper REST base URL.
    pub api_base_url: String,
    /// Scraper push endpoint.
    pub ws_url: String,
    /// Bound on every scraper REST call.
    pub request_timeout: Duration,
    /// Full-refetch period; `None` disables auto refresh.
    pub auto_refresh_interval: Option<Duration>,
    pub mock_data_enabled: bool,
    pub reconnect_delay: Duration,
    pub preferences_path: PathBuf,
    /// Unset selects the in-memory store.
    pub database_url: Option<String>,
    /// Offset that decides where "today" starts in queue statistics.
    pub local_offset: FixedOffset,
}

impl DashboardConfig {
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `API_BASE_URL`             | `http://localhost:8000`          |
    /// | `WS_URL`                   | `ws://localhost:8000/ws`         |
    /// | `REQUEST_TIMEOUT_MS`       | `10000`                          |
    /// | `AUTO_REFRESH_INTERVAL_MS` | `300000` (`0` disables)          |
    /// | `MOCK_DATA_ENABLED`        | `true`                           |
    /// | `RECONNECT_DELAY_MS`       | `5000`                           |
    /// | `PREFERENCES_PATH`         | `.islandboard/preferences.json`  |
    /// | `DATABASE_URL`             | unset (in-memory store)          |
    /// | `LOCAL_UTC_OFFSET_MINUTES` | `-240`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let request_timeout_ms: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_MS", 10_000)?;
        if request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_MS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }
        let auto_refresh_ms: u64 = parse_or(&lookup, "AUTO_REFRESH_INTERVAL_MS", 300_000)?;
        let reconnect_delay_ms: u64 = parse_or(&lookup, "RECONNECT_DELAY_MS", 5_000)?;

        let offset_minutes: i32 = parse_or(&lookup, "LOCAL_UTC_OFFSET_MINUTES", -240)?;
        let local_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                key: "LOCAL_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
                reason: "offset must be within +/- 24 hours".into(),
            })?;

        Ok(Self {
            api_base_url: string_or(&lookup, "API_BASE_URL", "http://localhost:8000"),
            ws_url: string_or(&lookup, "WS_URL", "ws://localhost:8000/ws"),
            request_timeout: Duration::from_millis(request_timeout_ms),
            auto_refresh_interval: (auto_refresh_ms > 0)
                .then(|| Duration::from_millis(auto_refresh_ms)),
            mock_data_enabled: parse_or(&lookup, "MOCK_DATA_ENABLED", true)?,
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
            preferences_path: PathBuf::from(string_or(
                &lookup,
                "PREFERENCES_PATH",
                ".islandboard/preferences.json",
            )),
            database_url: lookup("DATABASE_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            local_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, ["http://localhost:5173"]);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = ServerConfig::from_lookup(lookup(&[(
            "CORS_ORIGINS",
            "https://a.example, https://b.example,,",
        )]))
        .unwrap();
        assert_eq!(config.cors_origins, ["https://a.example", "https://b.example"]);
    }

    #[test]
    fn bad_port_names_the_key() {
        assert_matches!(
            ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(ConfigError::Invalid { key: "PORT", .. })
        );
    }

    #[test]
    fn dashboard_defaults() {
        let config = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.auto_refresh_interval, Some(Duration::from_secs(300)));
        assert!(config.mock_data_enabled);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.database_url.is_none());
        assert_eq!(config.local_offset.local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn zero_interval_disables_auto_refresh() {
        let config =
            DashboardConfig::from_lookup(lookup(&[("AUTO_REFRESH_INTERVAL_MS", "0")])).unwrap();
        assert!(config.auto_refresh_interval.is_none());
    }

    #[test]
    fn mock_flag_and_database_url() {
        let config = DashboardConfig::from_lookup(lookup(&[
            ("MOCK_DATA_ENABLED", "false"),
            ("DATABASE_URL", "postgres://localhost/islandboard"),
        ]))
        .unwrap();
        assert!(!config.mock_data_enabled);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/islandboard")
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_matches!(
            DashboardConfig::from_lookup(lookup(&[("MOCK_DATA_ENABLED", "yes")])),
            Err(ConfigError::Invalid { key: "MOCK_DATA_ENABLED", .. })
        );
        assert_matches!(
            DashboardConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_MS", "0")])),
            Err(ConfigError::Invalid { key: "REQUEST_TIMEOUT_MS", .. })
        );
        assert_matches!(
            DashboardConfig::from_lookup(lookup(&[("LOCAL_UTC_OFFSET_MINUTES", "2000")])),
            Err(ConfigError::Invalid { key: "LOCAL_UTC_OFFSET_MINUTES", .. })
        );
    }
}
