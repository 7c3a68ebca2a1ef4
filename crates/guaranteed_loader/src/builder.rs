// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;
use tick::Clock;

use crate::telemetry::LoaderTelemetry;
use crate::{Backoff, GuaranteedLoader, LoadPolicy, Result};

pub(crate) const DEFAULT_NAME: &str = "guaranteed_loader";

/// Builder for [`GuaranteedLoader`].
///
/// Created with [`GuaranteedLoader::builder`]. Policy values that are not set keep the defaults of
/// [`LoadPolicy`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use guaranteed_loader::GuaranteedLoader;
/// use tick::Clock;
///
/// let loader = GuaranteedLoader::<String, Vec<String>>::builder(Clock::new_frozen())
///     .name("tutoring_requests")
///     .ttl(Duration::from_secs(5))
///     .max_retries(2)
///     .retry_backoff(Duration::from_millis(100))
///     .build()?;
///
/// assert_eq!(loader.name(), "tutoring_requests");
/// assert_eq!(loader.policy().max_attempts(), 3);
/// # Ok::<(), guaranteed_loader::Error>(())
/// ```
#[derive(Debug)]
pub struct LoaderBuilder<K, V> {
    clock: Clock,
    name: &'static str,
    policy: LoadPolicy,
    telemetry: LoaderTelemetry,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> LoaderBuilder<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            name: DEFAULT_NAME,
            policy: LoadPolicy::default(),
            telemetry: LoaderTelemetry::default(),
            _marker: PhantomData,
        }
    }

    /// Sets the name reported in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Replaces the whole policy.
    #[must_use]
    pub fn policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets how long a cached value counts as fresh.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.policy = self.policy.with_ttl(ttl);
        self
    }

    /// Sets how many times a failed fetch is retried.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.policy = self.policy.with_max_retries(max_retries);
        self
    }

    /// Sets the base delay between retries.
    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.policy = self.policy.with_retry_backoff(retry_backoff);
        self
    }

    /// Sets how the delay grows from one retry to the next.
    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.policy = self.policy.with_backoff(backoff);
        self
    }

    /// Sets the upper bound on the delay before a single retry.
    #[must_use]
    pub fn max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.policy = self.policy.with_max_retry_delay(max_retry_delay);
        self
    }

    /// Sets the timeout of a single fetch attempt, or disables it with `None`.
    #[must_use]
    pub fn attempt_timeout(mut self, attempt_timeout: Option<Duration>) -> Self {
        self.policy = self.policy.with_attempt_timeout(attempt_timeout);
        self
    }

    /// Emits loader events as `tracing` events.
    #[cfg(any(feature = "logs", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
    #[must_use]
    pub fn logs(mut self) -> Self {
        self.telemetry = self.telemetry.with_logs();
        self
    }

    /// Records loader events and fetch durations with meters from `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.telemetry = self.telemetry.with_metrics(provider);
        self
    }

    /// Builds the loader.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the policy is invalid (see [`LoadPolicy::validate`]).
    pub fn build(self) -> Result<GuaranteedLoader<K, V>> {
        self.policy.validate()?;

        Ok(GuaranteedLoader::from_parts(self.name, self.policy, self.clock, self.telemetry))
    }
}
