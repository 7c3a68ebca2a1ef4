// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::Error;

/// Where the value of a [`LoadResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[non_exhaustive]
pub enum Origin {
    /// A cached value younger than the TTL. No remote call was made.
    FreshCache,
    /// A value just fetched from the remote source.
    Remote,
    /// A cached value older than the TTL, served because the remote source failed.
    StaleCache,
    /// The caller-supplied fallback, served because the remote source failed and nothing was cached.
    Fallback,
}

impl Origin {
    /// Returns the stable tag of this origin: `fresh-cache`, `remote`, `stale-cache` or `fallback`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FreshCache => "fresh-cache",
            Self::Remote => "remote",
            Self::StaleCache => "stale-cache",
            Self::Fallback => "fallback",
        }
    }

    /// Returns `true` if the value was served because the remote source failed.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::StaleCache | Self::Fallback)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a remote fetch that exhausted its attempts.
///
/// Cloning is cheap; the last error is shared between all callers that observed the same fetch.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    attempts: u32,
    last_error: Arc<Error>,
}

impl FetchFailure {
    pub(crate) fn new(attempts: u32, last_error: Error) -> Self {
        Self {
            attempts,
            last_error: Arc::new(last_error),
        }
    }

    /// Returns how many attempts were made, including the first one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the error of the final attempt.
    #[must_use]
    pub fn last_error(&self) -> &Error {
        &self.last_error
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.last_error)
    }
}

/// The outcome of [`GuaranteedLoader::load`][crate::GuaranteedLoader::load].
///
/// A load always produces a value. The [`origin`](Self::origin) tells which step of the chain
/// supplied it, and degraded results carry the [`failure`](Self::failure) that caused the
/// degradation.
#[derive(Debug, Clone)]
pub struct LoadResult<V> {
    value: V,
    origin: Origin,
    age: Option<Duration>,
    failure: Option<FetchFailure>,
}

impl<V> LoadResult<V> {
    pub(crate) fn fresh(value: V, age: Duration) -> Self {
        Self {
            value,
            origin: Origin::FreshCache,
            age: Some(age),
            failure: None,
        }
    }

    pub(crate) fn remote(value: V) -> Self {
        Self {
            value,
            origin: Origin::Remote,
            age: Some(Duration::ZERO),
            failure: None,
        }
    }

    pub(crate) fn stale(value: V, age: Duration, failure: FetchFailure) -> Self {
        Self {
            value,
            origin: Origin::StaleCache,
            age: Some(age),
            failure: Some(failure),
        }
    }

    pub(crate) fn fallback(value: V, failure: FetchFailure) -> Self {
        Self {
            value,
            origin: Origin::Fallback,
            age: None,
            failure: Some(failure),
        }
    }

    /// Returns a reference to the loaded value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the result and returns the loaded value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns where the value came from.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns how old the value is, or `None` for fallback values.
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        self.age
    }

    /// Returns the failed fetch that forced a degraded result.
    #[must_use]
    pub fn failure(&self) -> Option<&FetchFailure> {
        self.failure.as_ref()
    }

    /// Returns `true` if the value was served because the remote source failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.origin.is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(LoadResult<Vec<String>>: Send, Sync, Clone);
        static_assertions::assert_impl_all!(FetchFailure: Send, Sync, Clone);
    }

    #[rstest]
    #[case(Origin::FreshCache, "fresh-cache", false)]
    #[case(Origin::Remote, "remote", false)]
    #[case(Origin::StaleCache, "stale-cache", true)]
    #[case(Origin::Fallback, "fallback", true)]
    fn origin_tags(#[case] origin: Origin, #[case] tag: &str, #[case] degraded: bool) {
        assert_eq!(origin.as_str(), tag);
        assert_eq!(origin.to_string(), tag);
        assert_eq!(origin.is_degraded(), degraded);
    }

    #[test]
    fn fallback_has_no_age() {
        let failure = FetchFailure::new(3, Error::timeout(Duration::from_secs(1)));
        let result = LoadResult::fallback(vec![1, 2], failure);

        assert_eq!(result.origin(), Origin::Fallback);
        assert_eq!(result.age(), None);
        assert!(result.is_degraded());
        assert_eq!(result.failure().unwrap().attempts(), 3);
        assert_eq!(result.into_value(), vec![1, 2]);
    }

    #[test]
    fn remote_is_not_degraded() {
        let result = LoadResult::remote("value");

        assert_eq!(result.age(), Some(Duration::ZERO));
        assert!(result.failure().is_none());
        assert!(!result.is_degraded());
    }

    #[test]
    fn failure_display() {
        let failure = FetchFailure::new(2, Error::timeout(Duration::from_millis(500)));

        assert_eq!(
            failure.to_string(),
            "gave up after 2 attempt(s): remote fetch timed out after 500ms"
        );
        assert!(failure.clone().last_error().is_timeout());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn origin_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&Origin::StaleCache).unwrap(), "\"stale-cache\"");
    }
}
