// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Load policy: freshness window, retry budget, backoff and per-attempt timeout.

use std::time::Duration;

use crate::{Backoff, Error, Result};

/// Default freshness window for cached values: 5 minutes.
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default number of additional attempts after the first failed fetch.
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay before a retry, multiplied by the retry number.
pub(crate) const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Default upper bound on the delay before a single retry.
pub(crate) const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Largest accepted retry delay cap. Keeps the total backoff of a load bounded.
pub(crate) const MAX_RETRY_DELAY_LIMIT: Duration = Duration::from_secs(3600);

/// Default upper bound on a single fetch attempt.
pub(crate) const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard cap on the retry budget. Anything above is rejected as a configuration error.
pub(crate) const MAX_RETRIES_LIMIT: u32 = 100;

/// Describes how a single load behaves.
///
/// The default policy uses a 5 minute TTL, 3 retries with a linear 1 second backoff
/// (`1s, 2s, 3s`) and a 10 second timeout per attempt. No single retry delay exceeds
/// [`max_retry_delay`](Self::max_retry_delay), 30 seconds by default.
///
/// With the `serde` feature the policy can be read from configuration files. Durations are
/// expressed in whole milliseconds:
///
/// ```json
/// { "ttl_ms": 300000, "max_retries": 3, "retry_backoff_ms": 1000, "backoff": "linear", "max_retry_delay_ms": 30000, "attempt_timeout_ms": 10000 }
/// ```
///
/// A `null` `attempt_timeout_ms` disables the per-attempt timeout; missing fields keep their defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use guaranteed_loader::{Backoff, LoadPolicy};
///
/// let policy = LoadPolicy::default()
///     .with_ttl(Duration::from_secs(5))
///     .with_max_retries(2)
///     .with_retry_backoff(Duration::from_millis(100))
///     .with_backoff(Backoff::Linear);
///
/// assert_eq!(policy.ttl(), Duration::from_secs(5));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoadPolicy {
    #[cfg_attr(feature = "serde", serde(rename = "ttl_ms", with = "millis"))]
    ttl: Duration,
    max_retries: u32,
    #[cfg_attr(feature = "serde", serde(rename = "retry_backoff_ms", with = "millis"))]
    retry_backoff: Duration,
    backoff: Backoff,
    #[cfg_attr(feature = "serde", serde(rename = "max_retry_delay_ms", with = "millis"))]
    max_retry_delay: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "attempt_timeout_ms", with = "optional_millis"))]
    attempt_timeout: Option<Duration>,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            backoff: Backoff::Linear,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

impl LoadPolicy {
    /// Returns the freshness window of cached values.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the number of additional attempts after the first failure.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the total number of attempts a fetch may make (`max_retries + 1`).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the base delay before a retry.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// Returns the backoff strategy.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Returns the upper bound on the delay before a single retry.
    #[must_use]
    pub fn max_retry_delay(&self) -> Duration {
        self.max_retry_delay
    }

    /// Returns the timeout applied to each attempt, if any.
    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Returns the delay to wait before retry number `attempt` (1-based), capped at
    /// [`max_retry_delay`](Self::max_retry_delay).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        clamp_to_max(self.backoff.delay(self.retry_backoff, attempt), self.max_retry_delay)
    }

    /// Sets the freshness window.
    #[must_use]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    /// Sets the number of additional attempts after the first failure.
    #[must_use]
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self { max_retries, ..self }
    }

    /// Sets the base delay before a retry.
    #[must_use]
    pub fn with_retry_backoff(self, retry_backoff: Duration) -> Self {
        Self { retry_backoff, ..self }
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(self, backoff: Backoff) -> Self {
        Self { backoff, ..self }
    }

    /// Sets the upper bound on the delay before a single retry.
    #[must_use]
    pub fn with_max_retry_delay(self, max_retry_delay: Duration) -> Self {
        Self { max_retry_delay, ..self }
    }

    /// Sets the per-attempt timeout. `None` lets attempts run for as long as the source needs.
    #[must_use]
    pub fn with_attempt_timeout(self, attempt_timeout: Option<Duration>) -> Self {
        Self { attempt_timeout, ..self }
    }

    /// Checks that the policy can be used for loading.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the attempt timeout is zero (every attempt would time out
    /// before it starts), if the retry budget exceeds 100 attempts, or if the retry delay cap
    /// exceeds one hour.
    pub fn validate(&self) -> Result<()> {
        if self.attempt_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::configuration("attempt timeout must be greater than zero"));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::configuration(format!(
                "max retries must not exceed {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }

        if self.max_retry_delay > MAX_RETRY_DELAY_LIMIT {
            return Err(Error::configuration(format!(
                "max retry delay must not exceed {MAX_RETRY_DELAY_LIMIT:?}, got {:?}",
                self.max_retry_delay
            )));
        }

        Ok(())
    }
}

/// Per-call overrides applied on top of the loader's policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PolicyOverrides {
    pub ttl: Option<Duration>,
    pub max_retries: Option<u32>,
    pub retry_backoff: Option<Duration>,
    pub backoff: Option<Backoff>,
    pub max_retry_delay: Option<Duration>,
    pub attempt_timeout: Option<Option<Duration>>,
}

impl PolicyOverrides {
    pub fn apply(&self, base: LoadPolicy) -> LoadPolicy {
        LoadPolicy {
            ttl: self.ttl.unwrap_or(base.ttl),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            retry_backoff: self.retry_backoff.unwrap_or(base.retry_backoff),
            backoff: self.backoff.unwrap_or(base.backoff),
            max_retry_delay: self.max_retry_delay.unwrap_or(base.max_retry_delay),
            attempt_timeout: self.attempt_timeout.unwrap_or(base.attempt_timeout),
        }
    }
}

fn clamp_to_max(delay: Duration, max: Duration) -> Duration {
    delay.min(max)
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(feature = "serde")]
mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[expect(clippy::ref_option, reason = "signature required by serde(with)")]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|millis| millis.map(Duration::from_millis))
    }
}
