use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn to_str(&self) -> &str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// How a freelancer's open websocket learns about a hire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    Push,
    Poll,
}

impl NotificationMode {
    pub fn to_str(&self) -> &str {
        match self {
            NotificationMode::Push => "push",
            NotificationMode::Poll => "poll",
        }
    }
}

impl FromStr for NotificationMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "push" => Ok(NotificationMode::Push),
            "poll" => Ok(NotificationMode::Poll),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub notification_mode: NotificationMode,
    pub poll_interval_secs: u64,
    pub hire_timeout_ms: u64,
    pub degraded_after_failures: u32,
    pub log_level: String,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SECRET_KEY"))?;
        let jwt_maxage = parse_var("JWT_MAXAGE", 60)?;

        let storage_backend = parse_var("STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_maxage,
            port: parse_var("PORT", 8000)?,
            storage_backend,
            notification_mode: parse_var("NOTIFICATION_MODE", NotificationMode::Push)?,
            poll_interval_secs: parse_var("POLL_INTERVAL_SECS", 5)?,
            hire_timeout_ms: parse_var("HIRE_TIMEOUT_MS", 5000)?,
            degraded_after_failures: parse_var("DEGRADED_AFTER_FAILURES", 3)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("postgres".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert_eq!("Memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!("sqlite".parse::<StorageBackend>(), Err(()));
    }

    #[test]
    fn test_notification_mode_from_str() {
        assert_eq!("push".parse::<NotificationMode>(), Ok(NotificationMode::Push));
        assert_eq!("POLL".parse::<NotificationMode>(), Ok(NotificationMode::Poll));
        assert!("both".parse::<NotificationMode>().is_err());
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u64 = parse_var("GIGBID_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
