// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Loads a student's tutoring requests from a flaky backend and shows where each answer came from.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use guaranteed_loader::{Error, GuaranteedLoader, LoadOptions, LoadResult, RemoteSource};
use tick::Clock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stand-in for the requests endpoint; goes offline when `online` is cleared.
#[derive(Clone)]
struct RequestsApi {
    student_id: u32,
    online: Arc<AtomicBool>,
}

impl RemoteSource<Vec<String>> for RequestsApi {
    type Error = std::io::Error;

    async fn fetch(&self) -> Result<Vec<String>, Self::Error> {
        if self.online.load(Ordering::SeqCst) {
            Ok(vec![
                format!("student {}: algebra, Tuesday 17:00", self.student_id),
                format!("student {}: essay review, Friday 15:30", self.student_id),
            ])
        } else {
            Err(std::io::Error::other("connection refused"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).init();

    let clock = Clock::new_tokio();
    let loader = GuaranteedLoader::<String, Vec<String>>::builder(clock.clone())
        .name("tutoring_requests")
        .ttl(Duration::from_millis(500))
        .max_retries(2)
        .retry_backoff(Duration::from_millis(50))
        .attempt_timeout(Some(Duration::from_secs(1)))
        .logs()
        .build()?;

    let online = Arc::new(AtomicBool::new(true));
    let api = RequestsApi {
        student_id: 42,
        online: Arc::clone(&online),
    };
    let key = "requests:42".to_string();
    let options = || LoadOptions::new(vec!["requests are unavailable right now".to_string()]);

    show("first visit", &loader.load(key.clone(), api.clone(), options()).await);
    show("page refresh", &loader.load(key.clone(), api.clone(), options()).await);

    clock.delay(Duration::from_secs(1)).await;
    online.store(false, Ordering::SeqCst);
    show("backend outage", &loader.load(key.clone(), api.clone(), options()).await);

    loader.clear(Some(&key));
    show("outage after cache reset", &loader.load(key, api, options()).await);

    Ok(())
}

fn show(step: &str, result: &LoadResult<Vec<String>>) {
    let banner = if result.is_degraded() { " (data may be stale)" } else { "" };
    println!("{step}: served from {}{banner}", result.origin());

    for request in result.value() {
        println!("  - {request}");
    }

    if let Some(failure) = result.failure() {
        println!("  backend: {failure}");
    }
}
