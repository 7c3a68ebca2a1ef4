// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

/// The result for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error produced while configuring a loader or while fetching from a remote source.
///
/// Fetch, panic and timeout errors never escape [`GuaranteedLoader::load`][crate::GuaranteedLoader::load];
/// they are recorded in a [`FetchFailure`][crate::FetchFailure] attached to degraded results.
/// Configuration errors are reported eagerly by the builders, before any load is attempted.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use guaranteed_loader::LoadPolicy;
///
/// let policy = LoadPolicy::default().with_attempt_timeout(Some(Duration::ZERO));
/// let error = policy.validate().unwrap_err();
///
/// assert!(error.is_configuration());
/// ```
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(#[from] ErrorKind);

/// The category of an [`Error`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The remote source returned an error.
    #[error("remote fetch failed: {0}")]
    Fetch(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The remote source panicked during an attempt.
    #[error("remote fetch panicked: {0}")]
    Panicked(Cow<'static, str>),

    /// A single fetch attempt did not complete within the attempt timeout.
    #[error("remote fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The loader or the load options were configured with unusable values.
    #[error("invalid loader configuration: {0}")]
    Configuration(Cow<'static, str>),
}

impl Error {
    pub(crate) const fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub(crate) fn fetch(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::from_kind(ErrorKind::Fetch(Box::new(error)))
    }

    pub(crate) fn panicked(message: impl Into<Cow<'static, str>>) -> Self {
        Self::from_kind(ErrorKind::Panicked(message.into()))
    }

    pub(crate) const fn timeout(after: Duration) -> Self {
        Self::from_kind(ErrorKind::Timeout(after))
    }

    pub(crate) fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::from_kind(ErrorKind::Configuration(message.into()))
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Returns `true` if the remote source itself reported the failure.
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self.0, ErrorKind::Fetch(_))
    }

    /// Returns `true` if the remote source panicked instead of returning.
    #[must_use]
    pub const fn is_panicked(&self) -> bool {
        matches!(self.0, ErrorKind::Panicked(_))
    }

    /// Returns `true` if an attempt was abandoned because it exceeded the attempt timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.0, ErrorKind::Timeout(_))
    }

    /// Returns `true` if this error describes an invalid configuration.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.0, ErrorKind::Configuration(_))
    }
}
