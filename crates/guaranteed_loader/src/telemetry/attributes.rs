// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
pub(crate) const LOADER_NAME: &str = "loader.name";

#[cfg(any(feature = "metrics", test))]
pub(crate) const LOADER_ACTIVITY: &str = "loader.activity";

#[cfg(test)]
pub(crate) const LOADER_ATTEMPT: &str = "loader.attempt";

#[cfg(test)]
pub(crate) const LOADER_DURATION: &str = "loader.duration_ns";

#[cfg(test)]
pub(crate) const LOADER_EVENT: &str = "loader.event";
