use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::serde_duration;

/// Runtime circuit state for upstream metadata calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time spent open before probes are admitted.
    #[serde(with = "serde_duration::ms")]
    pub cooldown: Duration,
    /// Probes admitted while half-open before an outcome is recorded.
    pub half_open_max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
            half_open_max_probes: 1,
        }
    }
}

/// Read-only copy of the breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Wall-clock time of the most recent failure, rendered as RFC3339.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "rfc3339")]
    pub last_failure_at: Option<OffsetDateTime>,
    pub half_open_probes_remaining: u32,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_since: Option<Instant>,
    last_failure_at: Option<OffsetDateTime>,
    half_open_probes_remaining: u32,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            half_open_since: None,
            last_failure_at: None,
            half_open_probes_remaining: 0,
        }
    }
}

/// Thread-safe circuit breaker guarding the upstream metadata source.
///
/// Pure state bookkeeping: no method blocks or performs I/O, and the lock is
/// only held for the duration of a single transition.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns whether an upstream call may be attempted now.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and the
    /// caller becomes the first probe. Probes that never report an outcome
    /// (their caller was cancelled) are replaced once another cooldown has
    /// passed.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let stalled = inner.half_open_probes_remaining == 0
                    && inner
                        .half_open_since
                        .is_some_and(|since| since.elapsed() >= self.config.cooldown);
                if stalled {
                    tracing::warn!(
                        cooldown_ms = self.config.cooldown.as_millis() as u64,
                        "half-open probes reported no outcome; admitting new probes"
                    );
                    inner.half_open_since = Some(Instant::now());
                    inner.half_open_probes_remaining = self.config.half_open_max_probes;
                }

                if inner.half_open_probes_remaining > 0 {
                    inner.half_open_probes_remaining -= 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => {
                let can_probe = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.cooldown)
                    .unwrap_or(false);

                if can_probe {
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    inner.half_open_since = Some(Instant::now());
                    inner.half_open_probes_remaining =
                        self.config.half_open_max_probes.saturating_sub(1);
                    tracing::info!("circuit breaker half-open; admitting probe request");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(previous = %inner.state, "circuit breaker closed after successful call");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.half_open_since = None;
        inner.half_open_probes_remaining = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(OffsetDateTime::now_utc());

        let trips = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;
        if trips {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    consecutive_failures = inner.consecutive_failures,
                    cooldown_ms = self.config.cooldown.as_millis() as u64,
                    "circuit breaker opened"
                );
            }
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.half_open_since = None;
            inner.half_open_probes_remaining = 0;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
            half_open_probes_remaining: inner.half_open_probes_remaining,
        }
    }

    /// Forces the circuit closed and zeroes every counter.
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = CircuitInner::default();
        tracing::info!("circuit breaker reset");
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rfc3339<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(at) => {
            let formatted = at.format(&Rfc3339).map_err(S::Error::custom)?;
            serializer.serialize_str(&formatted)
        }
        None => serializer.serialize_none(),
    }
}
