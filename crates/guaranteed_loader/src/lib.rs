// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Best-effort data loading that always produces a value.
//!
//! [`GuaranteedLoader`] answers every request through a fixed chain of strategies:
//!
//! 1. **Fresh cache** - a cached value younger than the TTL is returned without any remote call.
//! 2. **Remote fetch** - the [`RemoteSource`] is called, retried with a growing [`Backoff`] and
//!    bounded by a per-attempt timeout. A successful result is cached.
//! 3. **Stale cache** - if every attempt failed, a cached value of any age is returned.
//! 4. **Fallback** - if nothing is cached, the fallback from the call's [`LoadOptions`] is returned.
//!
//! Backend failures never escape a load. Each [`LoadResult`] states its [`Origin`], so callers can
//! flag degraded data (stale or fallback) to their users, and carries the [`FetchFailure`] that
//! caused the degradation.
//!
//! Concurrent loads of the same key are coalesced into a single remote fetch whose outcome every
//! caller receives.
//!
//! # Time
//!
//! Freshness, backoff delays and attempt timeouts are all driven by an injected [`tick::Clock`].
//! Production code typically uses `Clock::new_tokio()`, while tests use `tick::ClockControl` to move
//! time forward deterministically.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use guaranteed_loader::{GuaranteedLoader, LoadOptions, Origin};
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let loader = GuaranteedLoader::<String, Vec<String>>::builder(Clock::new_frozen())
//!     .name("tutoring_requests")
//!     .ttl(Duration::from_secs(5))
//!     .max_retries(2)
//!     .retry_backoff(Duration::from_millis(100))
//!     .build()?;
//!
//! let result = loader
//!     .load(
//!         "requests:42".to_string(),
//!         || async { Ok::<_, std::io::Error>(vec!["algebra, Tuesday 5pm".to_string()]) },
//!         LoadOptions::new(Vec::new()),
//!     )
//!     .await;
//!
//! assert_eq!(result.origin(), Origin::Remote);
//! assert!(!result.is_degraded());
//! # Ok::<(), guaranteed_loader::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Features
//!
//! - `logs` - emits loader events through `tracing`.
//! - `metrics` - records loader events and fetch durations through OpenTelemetry.
//! - `serde` - serialization of [`LoadPolicy`] and [`Origin`], for reading policies from configuration.

mod backoff;
mod builder;
mod error;
mod loader;
mod options;
mod policy;
mod result;
mod retry;
mod source;
mod store;
mod telemetry;

pub use backoff::Backoff;
pub use builder::LoaderBuilder;
pub use error::{Error, ErrorKind, Result};
pub use loader::GuaranteedLoader;
pub use options::{LoadOptions, LoadOptionsBuilder};
pub use policy::LoadPolicy;
pub use result::{FetchFailure, LoadResult, Origin};
pub use source::RemoteSource;
pub use store::{CacheEntry, CacheStore};
