// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Concurrent loads of one key share a single remote fetch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{Shared, join, join_all};
use guaranteed_loader::{GuaranteedLoader, LoadOptions, Origin, RemoteSource};
use tick::ClockControl;

/// A backend whose fetches block until the test opens the gate.
#[derive(Clone)]
struct GatedBackend {
    calls: Arc<AtomicU32>,
    gate: Shared<oneshot::Receiver<()>>,
    healthy: bool,
}

impl GatedBackend {
    fn new(healthy: bool) -> (oneshot::Sender<()>, Self) {
        let (open, gate) = oneshot::channel();
        let backend = Self {
            calls: Arc::new(AtomicU32::new(0)),
            gate: gate.shared(),
            healthy,
        };

        (open, backend)
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteSource<Vec<String>> for GatedBackend {
    type Error = std::io::Error;

    async fn fetch(&self) -> Result<Vec<String>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.clone().await.expect("gate sender dropped");

        if self.healthy {
            Ok(vec!["calculus".to_string()])
        } else {
            Err(std::io::Error::other("backend down"))
        }
    }
}

/// A backend that panics when polled.
#[derive(Debug)]
struct ExplodingBackend;

impl RemoteSource<Vec<String>> for ExplodingBackend {
    type Error = std::io::Error;

    #[expect(clippy::panic, reason = "simulates a misbehaving source")]
    async fn fetch(&self) -> Result<Vec<String>, Self::Error> {
        panic!("source exploded")
    }
}

fn loader() -> GuaranteedLoader<String, Vec<String>> {
    // Timers never fire on a manual clock, so attempt timeouts cannot interfere.
    GuaranteedLoader::builder(ClockControl::new().to_clock())
        .max_retries(0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let loader = loader();
    let (open, backend) = GatedBackend::new(true);

    let loads = (0..10).map(|_| loader.load("requests:42".to_string(), backend.clone(), LoadOptions::new(Vec::new())));
    let (results, ()) = join(join_all(loads), async move {
        open.send(()).unwrap();
    })
    .await;

    assert_eq!(backend.calls(), 1);
    for result in &results {
        assert_eq!(result.origin(), Origin::Remote);
        assert_eq!(result.value(), &vec!["calculus".to_string()]);
    }
}

#[tokio::test]
async fn shared_failure_uses_each_callers_fallback() {
    let loader = loader();
    let (open, backend) = GatedBackend::new(false);

    let loads = (0..5).map(|i| {
        loader.load(
            "requests:42".to_string(),
            backend.clone(),
            LoadOptions::new(vec![format!("fallback {i}")]),
        )
    });
    let (results, ()) = join(join_all(loads), async move {
        open.send(()).unwrap();
    })
    .await;

    assert_eq!(backend.calls(), 1);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.origin(), Origin::Fallback);
        assert_eq!(result.value(), &vec![format!("fallback {i}")]);
        assert_eq!(result.failure().unwrap().attempts(), 1);
    }
}

#[tokio::test]
async fn different_keys_fetch_independently() {
    let loader = loader();
    let (open, backend) = GatedBackend::new(true);

    let first = loader.load("requests:1".to_string(), backend.clone(), LoadOptions::new(Vec::new()));
    let second = loader.load("requests:2".to_string(), backend.clone(), LoadOptions::new(Vec::new()));
    let ((first, second), ()) = join(join(first, second), async move {
        open.send(()).unwrap();
    })
    .await;

    assert_eq!(backend.calls(), 2);
    assert_eq!(first.origin(), Origin::Remote);
    assert_eq!(second.origin(), Origin::Remote);
}

#[tokio::test]
async fn caller_after_completion_reads_cache() {
    let loader = loader();
    let (open, backend) = GatedBackend::new(true);
    open.send(()).unwrap();

    let first = loader.load("requests:42".to_string(), backend.clone(), LoadOptions::new(Vec::new())).await;
    let second = loader.load("requests:42".to_string(), backend.clone(), LoadOptions::new(Vec::new())).await;

    assert_eq!(first.origin(), Origin::Remote);
    assert_eq!(second.origin(), Origin::FreshCache);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn panicking_source_degrades_and_frees_the_key() {
    let loader = loader();

    let result = loader
        .load("requests:42".to_string(), ExplodingBackend, LoadOptions::new(vec!["offline".to_string()]))
        .await;
    assert_eq!(result.origin(), Origin::Fallback);
    let failure = result.failure().unwrap();
    assert_eq!(failure.attempts(), 1);
    assert!(failure.last_error().is_panicked());
    assert!(failure.last_error().to_string().contains("source exploded"));

    let (open, backend) = GatedBackend::new(true);
    open.send(()).unwrap();
    let result = loader.load("requests:42".to_string(), backend.clone(), LoadOptions::new(Vec::new())).await;

    assert_eq!(result.origin(), Origin::Remote);
    assert_eq!(backend.calls(), 1);
}
