// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Loader telemetry.
//!
//! With the `logs` feature, loader events are emitted as `tracing` events. With the `metrics`
//! feature, they are counted through OpenTelemetry and fetch attempts are timed. Keys are never
//! recorded. Without either feature the telemetry handle compiles down to nothing.

use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::KeyValue;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};

pub(crate) mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

/// What happened during a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadActivity {
    FreshHit,
    Remote,
    Coalesced,
    AttemptFailed,
    AttemptTimedOut,
    Stale,
    Fallback,
}

impl LoadActivity {
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreshHit => "fresh_hit",
            Self::Remote => "remote",
            Self::Coalesced => "coalesced",
            Self::AttemptFailed => "attempt_failed",
            Self::AttemptTimedOut => "attempt_timed_out",
            Self::Stale => "stale",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct LoaderTelemetry {
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    fetch_duration: Option<Histogram<f64>>,
}

impl LoaderTelemetry {
    #[cfg(any(feature = "logs", test))]
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_metrics(self, provider: &dyn MeterProvider) -> Self {
        let meter = metrics::create_meter(provider);

        Self {
            event_counter: Some(metrics::create_event_counter(&meter)),
            fetch_duration: Some(metrics::create_fetch_duration_histogram(&meter)),
            ..self
        }
    }

    /// Records a loader event.
    ///
    /// `attempt` and `duration` are only meaningful for events produced by a fetch attempt.
    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "some arguments are only used in logs")
    )]
    pub fn record(&self, name: &'static str, activity: LoadActivity, attempt: Option<u32>, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        {
            let attrs = [
                KeyValue::new(attributes::LOADER_NAME, name),
                KeyValue::new(attributes::LOADER_ACTIVITY, activity.as_str()),
            ];

            if let Some(counter) = &self.event_counter {
                counter.add(1, &attrs);
            }

            if let (Some(d), Some(histogram)) = (duration, &self.fetch_duration) {
                histogram.record(d.as_secs_f64(), &attrs);
            }
        }

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            Self::emit(name, activity, attempt, duration);
        }
    }

    #[cfg(any(feature = "logs", test))]
    fn emit(name: &'static str, activity: LoadActivity, attempt: Option<u32>, duration: Option<Duration>) {
        let ev = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    loader.name = name,
                    loader.activity = ev,
                    loader.attempt = ?attempt,
                    loader.duration_ns = ?duration_ns,
                    "loader.event"
                )
            };
        }

        match activity {
            LoadActivity::FreshHit => emit_event!(debug),
            LoadActivity::Remote | LoadActivity::Coalesced => emit_event!(info),
            LoadActivity::AttemptFailed | LoadActivity::AttemptTimedOut | LoadActivity::Stale | LoadActivity::Fallback => {
                emit_event!(warn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{LogCapture, MetricTester};
    use super::*;

    #[test]
    fn activity_as_str() {
        assert_eq!(LoadActivity::FreshHit.as_str(), "fresh_hit");
        assert_eq!(LoadActivity::Remote.as_str(), "remote");
        assert_eq!(LoadActivity::Coalesced.as_str(), "coalesced");
        assert_eq!(LoadActivity::AttemptFailed.as_str(), "attempt_failed");
        assert_eq!(LoadActivity::AttemptTimedOut.as_str(), "attempt_timed_out");
        assert_eq!(LoadActivity::Stale.as_str(), "stale");
        assert_eq!(LoadActivity::Fallback.as_str(), "fallback");
    }

    #[test]
    fn metrics_record_emits_name_and_activity() {
        let tester = MetricTester::new();
        let telemetry = LoaderTelemetry::default().with_metrics(tester.meter_provider());

        telemetry.record("requests", LoadActivity::Remote, Some(1), Some(Duration::from_millis(5)));

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::LOADER_NAME, "requests"),
            KeyValue::new(attributes::LOADER_ACTIVITY, "remote"),
        ]);

        let names = tester.metric_names();
        assert!(names.iter().any(|n| n == "loader.event.count"), "{names:?}");
        assert!(names.iter().any(|n| n == "loader.fetch.duration"), "{names:?}");
    }

    #[test]
    fn disabled_telemetry_records_nothing() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        LoaderTelemetry::default().record("requests", LoadActivity::Fallback, None, None);

        assert!(capture.output().is_empty());
    }

    #[test]
    fn logs_contain_all_fields() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let telemetry = LoaderTelemetry::default().with_logs();

        telemetry.record(
            "requests",
            LoadActivity::AttemptTimedOut,
            Some(2),
            Some(Duration::from_nanos(12345)),
        );

        capture.assert_contains(attributes::LOADER_NAME);
        capture.assert_contains(attributes::LOADER_ACTIVITY);
        capture.assert_contains(attributes::LOADER_ATTEMPT);
        capture.assert_contains(attributes::LOADER_DURATION);
        capture.assert_contains(attributes::LOADER_EVENT);
        capture.assert_contains("requests");
        capture.assert_contains("attempt_timed_out");
        capture.assert_contains("12345");
    }

    #[test]
    fn logs_use_activity_level() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let telemetry = LoaderTelemetry::default().with_logs();

        telemetry.record("requests", LoadActivity::FreshHit, None, None);
        telemetry.record("requests", LoadActivity::Coalesced, None, None);
        telemetry.record("requests", LoadActivity::Stale, None, None);

        let output = capture.output();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3, "{output}");
        assert!(lines[0].contains("DEBUG"), "{output}");
        assert!(lines[1].contains("INFO"), "{output}");
        assert!(lines[2].contains("WARN"), "{output}");
    }
}
