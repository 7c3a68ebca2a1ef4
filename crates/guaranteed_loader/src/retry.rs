// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt as _;
use tick::{Clock, FutureExt};

use crate::telemetry::{LoadActivity, LoaderTelemetry};
use crate::{Error, FetchFailure, LoadPolicy, RemoteSource};

/// Calls `source` until it succeeds or the policy's attempts are used up.
///
/// Attempts are numbered from 1. After failed attempt `n` the loop waits
/// [`LoadPolicy::retry_delay(n)`](LoadPolicy::retry_delay) before trying again; no delay follows the
/// final attempt. A panicking source counts as a failed attempt.
pub(crate) async fn fetch_with_retries<S, V>(
    source: &S,
    policy: &LoadPolicy,
    clock: &Clock,
    telemetry: &LoaderTelemetry,
    name: &'static str,
) -> Result<V, FetchFailure>
where
    S: RemoteSource<V>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let stopwatch = clock.stopwatch();
        let outcome = run_attempt(source, policy.attempt_timeout(), clock).await;
        let elapsed = stopwatch.elapsed();

        let error = match outcome {
            Ok(value) => {
                telemetry.record(name, LoadActivity::Remote, Some(attempt), Some(elapsed));
                return Ok(value);
            }
            Err(error) => error,
        };

        let activity = if error.is_timeout() {
            LoadActivity::AttemptTimedOut
        } else {
            LoadActivity::AttemptFailed
        };
        telemetry.record(name, activity, Some(attempt), Some(elapsed));

        if attempt >= max_attempts {
            return Err(FetchFailure::new(attempt, error));
        }

        clock.delay(policy.retry_delay(attempt)).await;
    }
}

async fn run_attempt<S, V>(source: &S, timeout: Option<Duration>, clock: &Clock) -> Result<V, Error>
where
    S: RemoteSource<V>,
{
    let attempt = AssertUnwindSafe(source.fetch()).catch_unwind();

    let Some(timeout) = timeout else {
        return settle(attempt.await);
    };

    match attempt.timeout(clock, timeout).await {
        Ok(outcome) => settle(outcome),
        Err(_elapsed) => Err(Error::timeout(timeout)),
    }
}

fn settle<V, E>(outcome: std::thread::Result<Result<V, E>>) -> Result<V, Error>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match outcome {
        Ok(result) => result.map_err(Error::fetch),
        Err(payload) => Err(Error::panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Cow<'static, str> {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        Cow::Owned(message.clone())
    } else {
        Cow::Borrowed("non-string panic payload")
    }
}
