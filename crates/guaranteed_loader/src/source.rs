// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A remote backend that can produce a fresh value on demand.
///
/// Sources must be idempotent: a single load may call [`fetch`](Self::fetch) up to
/// `max_retries + 1` times. Errors are retried and eventually recorded, never surfaced by
/// [`GuaranteedLoader::load`][crate::GuaranteedLoader::load].
///
/// Any `Fn() -> impl Future<Output = Result<V, E>>` closure is a source, so most callers never
/// implement this trait by hand.
///
/// # Examples
///
/// Implementing the trait for a client type:
///
/// ```
/// use guaranteed_loader::RemoteSource;
///
/// struct RequestsApi {
///     user_id: u64,
/// }
///
/// impl RemoteSource<Vec<String>> for RequestsApi {
///     type Error = std::io::Error;
///
///     async fn fetch(&self) -> Result<Vec<String>, Self::Error> {
///         Ok(vec![format!("request for user {}", self.user_id)])
///     }
/// }
/// ```
///
/// Using a closure:
///
/// ```
/// use guaranteed_loader::RemoteSource;
///
/// fn assert_source<S: RemoteSource<Vec<u32>>>(_: S) {}
///
/// assert_source(|| async { Ok::<_, std::io::Error>(vec![1, 2, 3]) });
/// ```
pub trait RemoteSource<V> {
    /// The error returned when a fetch fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the current value from the backend.
    fn fetch(&self) -> impl Future<Output = Result<V, Self::Error>> + Send;
}

impl<V, E, F, Fut> RemoteSource<V> for F
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<V, E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn fetch(&self) -> impl Future<Output = Result<V, Self::Error>> + Send {
        self()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn closure_is_a_source() {
        let calls = Arc::new(AtomicU32::new(0));
        let source = {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>("value")
                }
            }
        };

        let value = futures::executor::block_on(source.fetch()).unwrap();

        assert_eq!(value, "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closure_errors_pass_through() {
        let source = || async { Err::<u32, _>(std::io::Error::other("boom")) };

        let error = futures::executor::block_on(source.fetch()).unwrap_err();

        assert_eq!(error.to_string(), "boom");
    }
}
