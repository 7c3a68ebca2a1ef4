// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::policy::PolicyOverrides;
use crate::{Backoff, Error, LoadPolicy, Result};

/// Per-call options of [`GuaranteedLoader::load`][crate::GuaranteedLoader::load].
///
/// Every load must provide a fallback value, served when the remote source fails and nothing is
/// cached for the key. The fallback is opaque to the loader; it is returned exactly as given.
///
/// Options created with [`new`](Self::new) use the loader's policy unchanged. Use
/// [`builder`](Self::builder) to override parts of the policy for a single call.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use guaranteed_loader::LoadOptions;
///
/// let defaults = LoadOptions::new(Vec::<String>::new());
///
/// let impatient = LoadOptions::builder()
///     .fallback(Vec::<String>::new())
///     .max_retries(0)
///     .attempt_timeout(Some(Duration::from_secs(2)))
///     .build()?;
/// # Ok::<(), guaranteed_loader::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct LoadOptions<V> {
    fallback: V,
    overrides: PolicyOverrides,
}

impl<V> LoadOptions<V> {
    /// Creates options that serve `fallback` as the last resort and otherwise use the loader's policy.
    #[must_use]
    pub fn new(fallback: V) -> Self {
        Self {
            fallback,
            overrides: PolicyOverrides::default(),
        }
    }

    /// Creates a builder for options with policy overrides.
    #[must_use]
    pub fn builder() -> LoadOptionsBuilder<V> {
        LoadOptionsBuilder::new()
    }

    /// Returns the fallback value.
    #[must_use]
    pub fn fallback(&self) -> &V {
        &self.fallback
    }

    pub(crate) fn resolve(self, base: LoadPolicy) -> (LoadPolicy, V) {
        (self.overrides.apply(base), self.fallback)
    }
}

/// Builder for [`LoadOptions`].
///
/// Values that are not set fall back to the policy of the loader the options are used with.
#[derive(Debug, Clone)]
pub struct LoadOptionsBuilder<V> {
    fallback: Option<V>,
    overrides: PolicyOverrides,
}

impl<V> LoadOptionsBuilder<V> {
    fn new() -> Self {
        Self {
            fallback: None,
            overrides: PolicyOverrides::default(),
        }
    }

    /// Sets the value served when every other step fails. Required.
    #[must_use]
    pub fn fallback(mut self, fallback: V) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Overrides the freshness window.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.overrides.ttl = Some(ttl);
        self
    }

    /// Overrides the number of retries after the first failed attempt.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.overrides.max_retries = Some(max_retries);
        self
    }

    /// Overrides the base delay between retries.
    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.overrides.retry_backoff = Some(retry_backoff);
        self
    }

    /// Overrides the backoff strategy.
    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.overrides.backoff = Some(backoff);
        self
    }

    /// Overrides the upper bound on the delay before a single retry.
    #[must_use]
    pub fn max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.overrides.max_retry_delay = Some(max_retry_delay);
        self
    }

    /// Overrides the per-attempt timeout. `None` disables the timeout for this call.
    #[must_use]
    pub fn attempt_timeout(mut self, attempt_timeout: Option<Duration>) -> Self {
        self.overrides.attempt_timeout = Some(attempt_timeout);
        self
    }

    /// Builds the options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no fallback was set, or if an override is unusable
    /// (see [`LoadPolicy::validate`]).
    pub fn build(self) -> Result<LoadOptions<V>> {
        let fallback = self
            .fallback
            .ok_or_else(|| Error::configuration("a fallback value is required"))?;

        // every check in `validate` looks at a single field, so the default base is representative
        self.overrides.apply(LoadPolicy::default()).validate()?;

        Ok(LoadOptions {
            fallback,
            overrides: self.overrides,
        })
    }
}
