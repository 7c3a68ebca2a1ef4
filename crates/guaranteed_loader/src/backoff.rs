// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Controls how the delay before each retry grows with the attempt number.
///
/// The delay is computed from the policy's base delay
/// ([`LoadPolicy::retry_backoff`][crate::LoadPolicy::retry_backoff]) and the 1-based number of the retry
/// that is about to happen. Delays saturate at [`Duration::MAX`] instead of overflowing; loads
/// further cap them at [`LoadPolicy::max_retry_delay`][crate::LoadPolicy::max_retry_delay].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Backoff {
    /// The same delay before every retry.
    ///
    /// **Example with `1s` base delay:** `1s, 1s, 1s, ...`
    Constant,

    /// The delay grows proportionally with the retry number.
    ///
    /// **Example with `1s` base delay:** `1s, 2s, 3s, ...`
    #[default]
    Linear,

    /// The delay doubles with every retry.
    ///
    /// **Example with `1s` base delay:** `1s, 2s, 4s, ...`
    Exponential,
}

impl Backoff {
    /// Returns the delay to wait before retry number `attempt` (1-based).
    ///
    /// An `attempt` of zero is treated as the first retry.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use guaranteed_loader::Backoff;
    ///
    /// let base = Duration::from_millis(100);
    ///
    /// assert_eq!(Backoff::Linear.delay(base, 3), Duration::from_millis(300));
    /// assert_eq!(Backoff::Exponential.delay(base, 3), Duration::from_millis(400));
    /// ```
    #[must_use]
    pub fn delay(self, base: Duration, attempt: u32) -> Duration {
        let attempt = attempt.max(1);

        match self {
            Self::Constant => base,
            Self::Linear => base.saturating_mul(attempt),
            Self::Exponential => match 1_u32.checked_shl(attempt - 1) {
                Some(factor) => base.saturating_mul(factor),
                None if base.is_zero() => Duration::ZERO,
                None => Duration::MAX,
            },
        }
    }
}
