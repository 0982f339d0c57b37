//! Ambient process configuration, loaded from the environment at startup.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading [`ProcessConfig`] from the environment.
/// Kept separate from [`crate::error::CacheError`] because these failures
/// are reported before any cache exists and never sit on the hot path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("{name} must be {requirement}, got {value}")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
        value: String,
    },
}

/// Recognized environment variables: `PORT`, `CACHE_TTL`, `MAX_CACHE_SIZE`,
/// `MAX_KEYS`. All optional; unset variables fall back to the defaults
/// below. Does not cover `shard_count` or the evictor factory — those are
/// pinned by the process entry point, not sourced from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    pub port: u16,
    pub cache_ttl: Duration,
    pub max_cache_size: u64,
    pub max_keys: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cache_ttl: Duration::from_secs(30 * 60),
            max_cache_size: 1024 * 1024 * 1024,
            max_keys: 2_000_000,
        }
    }
}

impl ProcessConfig {
    /// Load configuration from the process environment, falling back to
    /// defaults for any variable that is unset. Fails fast on the first
    /// variable that is present but fails to parse or fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(raw) = read_var("PORT") {
            let port: u16 = raw.parse().map_err(|e| invalid("PORT", format!("{e}")))?;
            cfg.port = port;
        }
        if cfg.port == 0 {
            return Err(out_of_range("PORT", "between 1 and 65535", cfg.port));
        }

        if let Some(raw) = read_var("CACHE_TTL") {
            cfg.cache_ttl = parse_duration(&raw).map_err(|e| invalid("CACHE_TTL", e))?;
        }
        if cfg.cache_ttl.is_zero() {
            return Err(out_of_range(
                "CACHE_TTL",
                "a positive duration",
                format!("{:?}", cfg.cache_ttl),
            ));
        }

        if let Some(raw) = read_var("MAX_CACHE_SIZE") {
            let size: u64 = raw
                .parse()
                .map_err(|e| invalid("MAX_CACHE_SIZE", format!("{e}")))?;
            cfg.max_cache_size = size;
        }
        if cfg.max_cache_size == 0 {
            return Err(out_of_range(
                "MAX_CACHE_SIZE",
                "a positive integer",
                cfg.max_cache_size,
            ));
        }

        if let Some(raw) = read_var("MAX_KEYS") {
            let keys: usize = raw
                .parse()
                .map_err(|e| invalid("MAX_KEYS", format!("{e}")))?;
            cfg.max_keys = keys;
        }
        if cfg.max_keys == 0 {
            return Err(out_of_range("MAX_KEYS", "a positive integer", cfg.max_keys));
        }

        Ok(cfg)
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.into(),
    }
}

fn out_of_range(
    name: &'static str,
    requirement: &'static str,
    value: impl std::fmt::Debug,
) -> ConfigError {
    ConfigError::OutOfRange {
        name,
        requirement,
        value: format!("{value:?}"),
    }
}

/// Parse a Go-`time.ParseDuration`-style string: a positive integer
/// immediately followed by a unit suffix (`ms`, `s`, `m`, `h`).
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split_at = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit suffix in {raw:?}"))?;
    let (digits, unit) = raw.split_at(split_at);
    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("invalid numeric component in {raw:?}"))?;
    let multiplier = match unit {
        "ms" => 1,
        "s" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        other => return Err(format!("unrecognized duration unit {other:?}")),
    };
    Ok(Duration::from_millis(amount * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // `std::env::set_var` is process-global; serialize the tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for var in ["PORT", "CACHE_TTL", "MAX_CACHE_SIZE", "MAX_KEYS"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();
        let cfg = ProcessConfig::from_env().unwrap();
        assert_eq!(cfg, ProcessConfig::default());
    }

    #[test]
    fn rejects_non_numeric_port() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();
        std::env::set_var("PORT", "not-a-port");
        assert!(ProcessConfig::from_env().is_err());
        clear_vars();
    }

    #[test]
    fn rejects_zero_max_keys() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();
        std::env::set_var("MAX_KEYS", "0");
        assert!(ProcessConfig::from_env().is_err());
        clear_vars();
    }

    #[test]
    fn rejects_zero_max_cache_size() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();
        std::env::set_var("MAX_CACHE_SIZE", "0");
        assert!(ProcessConfig::from_env().is_err());
        clear_vars();
    }

    #[test]
    fn rejects_unparseable_ttl() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();
        std::env::set_var("CACHE_TTL", "eventually");
        assert!(ProcessConfig::from_env().is_err());
        clear_vars();
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(30 * 60));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }
}
