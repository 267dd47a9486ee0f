use std::time::Duration;
use thiserror::Error;

/// Service configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | DATABASE_URL | sqlite:orders.db | SQLite database (orders, inbox, dead letters) |
/// | HTTP_PORT | 8081 | HTTP API port |
/// | CACHE_SIZE | 5 | Order cache capacity, must be > 0 |
/// | FEED_POLL_INTERVAL_MS | 500 | Inbox poll interval when idle |
/// | DLQ_TIMEOUT_MS | 2000 | Dead-letter publish timeout |
/// | SHUTDOWN_TIMEOUT_MS | 5000 | Grace period for background tasks and in-flight requests |
/// | INBOX_RETENTION_MS | 604800000 | Age after which committed inbox rows are deleted |
/// | ENVIRONMENT | development | development / staging / production |
/// | LOG_LEVEL | info | Default log level when RUST_LOG is unset |
/// | LOG_JSON | true in production, else false | JSON log lines |
/// | LOG_DIR | (unset) | Also write daily-rotated log files here |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub http_port: u16,
    pub cache_size: usize,
    pub feed_poll_interval_ms: u64,
    pub dlq_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub inbox_retention_ms: u64,
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("CACHE_SIZE must be greater than zero")]
    ZeroCacheSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:orders.db".into(),
            http_port: 8081,
            cache_size: 5,
            feed_poll_interval_ms: 500,
            dlq_timeout_ms: 2000,
            shutdown_timeout_ms: 5000,
            // 7 天
            inbox_retention_ms: 7 * 24 * 60 * 60 * 1000,
            environment: "development".into(),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from the process environment; unset variables take defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let log_json = var("LOG_JSON")
            .map(|v| {
                parse_bool(&v).ok_or(ConfigError::Invalid {
                    name: "LOG_JSON",
                    expected: "true or false",
                    value: v,
                })
            })
            .transpose()?;

        let mut config = Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            http_port: parse(&var, "HTTP_PORT", "a port number", defaults.http_port)?,
            cache_size: parse(&var, "CACHE_SIZE", "a positive integer", defaults.cache_size)?,
            feed_poll_interval_ms: parse(
                &var,
                "FEED_POLL_INTERVAL_MS",
                "milliseconds",
                defaults.feed_poll_interval_ms,
            )?,
            dlq_timeout_ms: parse(&var, "DLQ_TIMEOUT_MS", "milliseconds", defaults.dlq_timeout_ms)?,
            shutdown_timeout_ms: parse(
                &var,
                "SHUTDOWN_TIMEOUT_MS",
                "milliseconds",
                defaults.shutdown_timeout_ms,
            )?,
            inbox_retention_ms: parse(
                &var,
                "INBOX_RETENTION_MS",
                "milliseconds",
                defaults.inbox_retention_ms,
            )?,
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: defaults.log_json,
            log_dir: var("LOG_DIR"),
        };

        if config.cache_size == 0 {
            return Err(ConfigError::ZeroCacheSize);
        }
        config.log_json = log_json.unwrap_or_else(|| config.is_production());
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn feed_poll_interval(&self) -> Duration {
        Duration::from_millis(self.feed_poll_interval_ms)
    }

    pub fn dlq_timeout(&self) -> Duration {
        Duration::from_millis(self.dlq_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn inbox_retention(&self) -> Duration {
        Duration::from_millis(self.inbox_retention_ms)
    }
}

fn parse<T, F>(var: &F, name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.http_port, 8081);
        assert_eq!(config.cache_size, 5);
        assert!(!config.is_production());
        assert!(!config.log_json);
        assert_eq!(config.inbox_retention(), Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn test_production_logs_json_unless_overridden() {
        let config = load(&[("ENVIRONMENT", "production")]).unwrap();
        assert!(config.log_json);

        let config = load(&[("ENVIRONMENT", "production"), ("LOG_JSON", "false")]).unwrap();
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("HTTP_PORT", "9000"),
            ("CACHE_SIZE", "100"),
            ("DLQ_TIMEOUT_MS", "250"),
            ("INBOX_RETENTION_MS", "60000"),
            ("ENVIRONMENT", "production"),
            ("LOG_JSON", "true"),
            ("LOG_DIR", "/var/log/orders"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.cache_size, 100);
        assert_eq!(config.dlq_timeout(), Duration::from_millis(250));
        assert_eq!(config.inbox_retention(), Duration::from_secs(60));
        assert!(config.is_production());
        assert!(config.log_json);
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/orders"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("HTTP_PORT", ""), ("LOG_DIR", "  ")]).unwrap();
        assert_eq!(config.http_port, 8081);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert_eq!(
            load(&[("HTTP_PORT", "eighty")]).unwrap_err(),
            ConfigError::Invalid {
                name: "HTTP_PORT",
                expected: "a port number",
                value: "eighty".into(),
            }
        );
        assert!(load(&[("LOG_JSON", "maybe")]).is_err());
        assert_eq!(load(&[("CACHE_SIZE", "0")]).unwrap_err(), ConfigError::ZeroCacheSize);
    }
}
