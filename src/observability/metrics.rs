//! Metrics for normalization and aggregation runs
//!
//! Names follow Prometheus conventions. Recording goes through the free
//! functions in the phase submodules; with no recorder installed they are
//! no-ops, so library code can call them unconditionally.

use std::fmt;
use std::path::Path;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Every metric the crate records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Normalize metrics
    NormalizeSuccess,
    NormalizeFailure,

    // Sources metrics
    SourcesFetchSuccess,
    SourcesFetchError,
    SourcesEventsFetched,

    // Aggregate metrics
    AggregateEventsInRange,
    AggregateDuplicatesDropped,
    AggregateRunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NormalizeSuccess => "event_calendar_normalize_success_total",
            MetricName::NormalizeFailure => "event_calendar_normalize_failure_total",
            MetricName::SourcesFetchSuccess => "event_calendar_sources_fetch_success_total",
            MetricName::SourcesFetchError => "event_calendar_sources_fetch_error_total",
            MetricName::SourcesEventsFetched => "event_calendar_sources_events_fetched_total",
            MetricName::AggregateEventsInRange => "event_calendar_aggregate_events_in_range",
            MetricName::AggregateDuplicatesDropped => "event_calendar_aggregate_duplicates_dropped_total",
            MetricName::AggregateRunDuration => "event_calendar_aggregate_run_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            NormalizeSuccess,
            NormalizeFailure,
            SourcesFetchSuccess,
            SourcesFetchError,
            SourcesEventsFetched,
            AggregateEventsInRange,
            AggregateDuplicatesDropped,
            AggregateRunDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus recorder and hand back its handle for rendering
pub fn init() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Metrics system initialized");
    Ok(handle)
}

/// Write the current Prometheus text exposition to `path`
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, handle.render())
}

pub mod normalize {
    use super::MetricName;
    use crate::temporal::Confidence;

    /// Record a listing normalized at the given confidence
    pub fn success(confidence: Confidence) {
        ::metrics::counter!(MetricName::NormalizeSuccess.as_str(), "confidence" => confidence.as_str())
            .increment(1);
    }

    /// Record a listing skipped because its date text failed to normalize
    pub fn failure(kind: &'static str) {
        ::metrics::counter!(MetricName::NormalizeFailure.as_str(), "kind" => kind).increment(1);
    }
}

pub mod sources {
    use super::MetricName;

    pub fn fetch_success(source: &str, events: usize) {
        ::metrics::counter!(MetricName::SourcesFetchSuccess.as_str(), "source" => source.to_string())
            .increment(1);
        ::metrics::counter!(MetricName::SourcesEventsFetched.as_str(), "source" => source.to_string())
            .increment(events as u64);
    }

    pub fn fetch_error(source: &str) {
        ::metrics::counter!(MetricName::SourcesFetchError.as_str(), "source" => source.to_string())
            .increment(1);
    }
}

pub mod aggregate {
    use super::MetricName;

    pub fn events_in_range(count: usize) {
        ::metrics::gauge!(MetricName::AggregateEventsInRange.as_str()).set(count as f64);
    }

    pub fn duplicates_dropped(count: usize) {
        ::metrics::counter!(MetricName::AggregateDuplicatesDropped.as_str()).increment(count as u64);
    }

    pub fn run_duration(secs: f64) {
        ::metrics::histogram!(MetricName::AggregateRunDuration.as_str()).record(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<_> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("event_calendar_")));
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(
            MetricName::SourcesFetchError.to_string(),
            "event_calendar_sources_fetch_error_total"
        );
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        normalize::success(crate::temporal::Confidence::Exact);
        normalize::failure("empty_input");
        sources::fetch_success("feed", 3);
        sources::fetch_error("feed");
        aggregate::events_in_range(2);
    }
}
