//! Resolver configuration.
//!
//! [`ResolverConfig::from_env`] overlays `SHELFWISE_*` environment variables
//! on top of the defaults:
//!
//! | Variable | Field | Unit |
//! |----------|-------|------|
//! | `SHELFWISE_BREAKER_FAILURE_THRESHOLD` | `circuit_breaker.failure_threshold` | count |
//! | `SHELFWISE_BREAKER_COOLDOWN_MS` | `circuit_breaker.cooldown` | ms |
//! | `SHELFWISE_BREAKER_HALF_OPEN_PROBES` | `circuit_breaker.half_open_max_probes` | count |
//! | `SHELFWISE_CACHE_MAX_SIZE` | `cache.max_size` | entries (`0` disables) |
//! | `SHELFWISE_CACHE_TTL_MS` | `cache.ttl` | ms (`0` = no expiry) |
//! | `SHELFWISE_CACHE_NOT_FOUND_TTL_MS` | `cache.not_found_ttl` | ms (`0` = no expiry) |
//! | `SHELFWISE_FALLBACK_ENABLED` | `fallback_enabled` | bool |
//! | `SHELFWISE_UPSTREAM_TIMEOUT_MS` | `upstream_timeout` | ms |
//! | `SHELFWISE_BATCH_CONCURRENCY` | `batch_concurrency` | count |
//! | `SHELFWISE_MAX_SEARCH_LIMIT` | `max_search_limit` | count |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::ConfigError;

/// Top-level configuration for [`BookResolver`](crate::BookResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,
    /// Serve fallback records when upstream is unusable.
    pub fallback_enabled: bool,
    /// Upper bound for a single upstream call, retries included.
    #[serde(with = "serde_duration::ms")]
    pub upstream_timeout: Duration,
    /// Maximum number of concurrent lookups in a batch.
    pub batch_concurrency: usize,
    /// Upper bound applied to title search limits.
    pub max_search_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            fallback_enabled: true,
            upstream_timeout: Duration::from_secs(10),
            batch_concurrency: 4,
            max_search_limit: 40,
        }
    }
}

impl ResolverConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = parse_var::<u32, _>(&lookup, "SHELFWISE_BREAKER_FAILURE_THRESHOLD")? {
            config.circuit_breaker.failure_threshold = value;
        }
        if let Some(value) = parse_var::<u64, _>(&lookup, "SHELFWISE_BREAKER_COOLDOWN_MS")? {
            config.circuit_breaker.cooldown = Duration::from_millis(value);
        }
        if let Some(value) = parse_var::<u32, _>(&lookup, "SHELFWISE_BREAKER_HALF_OPEN_PROBES")? {
            config.circuit_breaker.half_open_max_probes = value;
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "SHELFWISE_CACHE_MAX_SIZE")? {
            config.cache.max_size = value;
        }
        if let Some(value) = parse_var::<u64, _>(&lookup, "SHELFWISE_CACHE_TTL_MS")? {
            config.cache.ttl = optional_ms(value);
        }
        if let Some(value) = parse_var::<u64, _>(&lookup, "SHELFWISE_CACHE_NOT_FOUND_TTL_MS")? {
            config.cache.not_found_ttl = optional_ms(value);
        }
        if let Some(value) = parse_var::<bool, _>(&lookup, "SHELFWISE_FALLBACK_ENABLED")? {
            config.fallback_enabled = value;
        }
        if let Some(value) = parse_var::<u64, _>(&lookup, "SHELFWISE_UPSTREAM_TIMEOUT_MS")? {
            config.upstream_timeout = Duration::from_millis(value);
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "SHELFWISE_BATCH_CONCURRENCY")? {
            config.batch_concurrency = value;
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "SHELFWISE_MAX_SEARCH_LIMIT")? {
            config.max_search_limit = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would leave the resolver unable to make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::MustBePositive {
                field: "circuit_breaker.failure_threshold",
            });
        }
        if self.circuit_breaker.half_open_max_probes == 0 {
            return Err(ConfigError::MustBePositive {
                field: "circuit_breaker.half_open_max_probes",
            });
        }
        if self.upstream_timeout.is_zero() {
            return Err(ConfigError::MustBePositive {
                field: "upstream_timeout",
            });
        }
        if self.batch_concurrency == 0 {
            return Err(ConfigError::MustBePositive {
                field: "batch_concurrency",
            });
        }
        if self.max_search_limit == 0 {
            return Err(ConfigError::MustBePositive {
                field: "max_search_limit",
            });
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .to_ascii_lowercase()
        .parse::<T>()
        .map(Some)
        .map_err(|error| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            reason: error.to_string(),
        })
}

fn optional_ms(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_millis(value))
}

/// Millisecond (de)serialization for durations in config and stats payloads.
pub(crate) mod serde_duration {
    pub mod ms {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_u64(crate::lookup::duration_ms(*value))
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
        where
            D: Deserializer<'de>,
        {
            u64::deserialize(deserializer).map(Duration::from_millis)
        }
    }

    pub mod option_ms {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(duration) => serializer.serialize_some(&crate::lookup::duration_ms(*duration)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<u64>::deserialize(deserializer).map(|value| value.map(Duration::from_millis))
        }
    }
}
