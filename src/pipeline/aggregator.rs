use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Datelike;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::apis::{EventSource, RawEvent, SourceRegistry};
use crate::common::error::{ParseError, SourceError};
use crate::domain::{detect_location_type, normalize_cost, parse_speakers, Event};
use crate::observability::metrics;
use crate::temporal::{DateWindow, Normalizer, RawTemporalInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Success,
    Error,
    Disabled,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Success => "success",
            SourceStatus::Error => "error",
            SourceStatus::Disabled => "disabled",
        }
    }
}

/// Outcome of one source within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub status: SourceStatus,
    /// Listings that normalized, in or out of the window
    pub total_events: usize,
    pub in_range_events: usize,
    /// Listings dropped because their date text did not normalize
    pub skipped: usize,
    pub error_message: Option<String>,
}

impl SourceReport {
    fn new(name: &str, status: SourceStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            total_events: 0,
            in_range_events: 0,
            skipped: 0,
            error_message: None,
        }
    }
}

/// Result of a complete aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub window: DateWindow,
    /// In-window, deduplicated, chronological
    pub events: Vec<Event>,
    /// One entry per registered source, in registry order
    pub sources: Vec<SourceReport>,
    pub skipped: usize,
    pub duplicates: usize,
}

impl AggregateReport {
    /// The text listing, one block per event
    pub fn render_listing(&self) -> String {
        self.events
            .iter()
            .map(Event::to_display_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn render_status(&self) -> String {
        let mut lines = vec![format!(
            "{} events between {} ({} skipped, {} duplicates)",
            self.events.len(),
            self.window.describe(),
            self.skipped,
            self.duplicates
        )];
        for source in &self.sources {
            let mut line = format!(
                "  {} [{}]: {} events, {} in range",
                source.name,
                source.status.as_str(),
                source.total_events,
                source.in_range_events
            );
            if source.skipped > 0 {
                line.push_str(&format!(", {} skipped", source.skipped));
            }
            if let Some(message) = &source.error_message {
                line.push_str(&format!(" - {message}"));
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.status == SourceStatus::Error)
    }
}

/// Fetches every enabled source with bounded concurrency, normalizes their
/// listings and merges them into one chronological, deduplicated list.
///
/// A source that fails, or a listing that does not normalize, is recorded and
/// skipped; neither aborts the run.
#[derive(Debug, Clone)]
pub struct Aggregator {
    window: DateWindow,
    max_concurrent: usize,
    reference_year: i32,
    normalizer: Normalizer<'static>,
}

type FetchOutcome = (usize, Result<Vec<RawEvent>, SourceError>);

impl Aggregator {
    pub fn new(window: DateWindow, max_concurrent: usize) -> Self {
        Self {
            reference_year: window.start.year(),
            window,
            max_concurrent: max_concurrent.max(1),
            normalizer: Normalizer::default(),
        }
    }

    /// Year substituted into listings that omit one
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer<'static>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[instrument(skip(self, registry), fields(sources = registry.len(), window = %self.window.describe()))]
    pub async fn run(&self, registry: &SourceRegistry) -> AggregateReport {
        let started = Instant::now();
        let fetched = self.fetch_all(registry).await;

        let mut reports = Vec::with_capacity(registry.len());
        let mut seen = HashSet::new();
        let mut events = Vec::new();
        let mut skipped = 0;
        let mut duplicates = 0;

        for (index, source) in registry.iter().enumerate() {
            if !source.enabled() {
                debug!(source = source.name(), "source disabled");
                reports.push(SourceReport::new(source.name(), SourceStatus::Disabled));
                continue;
            }

            let raw_events = match fetched.get(index).and_then(Option::as_ref) {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    error!(source = source.name(), error = %e, "source failed");
                    metrics::sources::fetch_error(source.name());
                    let mut report = SourceReport::new(source.name(), SourceStatus::Error);
                    report.error_message = Some(e.to_string());
                    reports.push(report);
                    continue;
                }
                None => {
                    metrics::sources::fetch_error(source.name());
                    let mut report = SourceReport::new(source.name(), SourceStatus::Error);
                    report.error_message = Some("fetch task did not complete".to_string());
                    reports.push(report);
                    continue;
                }
            };
            metrics::sources::fetch_success(source.name(), raw_events.len());

            let mut report = SourceReport::new(source.name(), SourceStatus::Success);
            for raw in raw_events {
                let event = match self.build_event(source.as_ref(), raw) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(
                            source = source.name(),
                            title = %raw.title,
                            date_text = %raw.date_text,
                            kind = e.kind(),
                            error = %e,
                            "skipping listing with unparseable date"
                        );
                        metrics::normalize::failure(e.kind());
                        report.skipped += 1;
                        continue;
                    }
                };
                metrics::normalize::success(event.confidence);
                report.total_events += 1;

                if !event.is_within(&self.window) {
                    continue;
                }
                report.in_range_events += 1;
                if seen.insert(event.id) {
                    events.push(event);
                } else {
                    duplicates += 1;
                }
            }

            info!(
                source = source.name(),
                total = report.total_events,
                in_range = report.in_range_events,
                skipped = report.skipped,
                "source processed"
            );
            skipped += report.skipped;
            reports.push(report);
        }

        events.sort();
        metrics::aggregate::events_in_range(events.len());
        metrics::aggregate::duplicates_dropped(duplicates);
        metrics::aggregate::run_duration(started.elapsed().as_secs_f64());
        info!(events = events.len(), skipped, duplicates, "aggregation finished");

        AggregateReport {
            window: self.window,
            events,
            sources: reports,
            skipped,
            duplicates,
        }
    }

    /// Fetch enabled sources concurrently, at most `max_concurrent` at once.
    /// Results are indexed by registry position.
    async fn fetch_all(&self, registry: &SourceRegistry) -> Vec<Option<Result<Vec<RawEvent>, SourceError>>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();

        for (index, source) in registry.iter().enumerate() {
            if !source.enabled() {
                continue;
            }
            let source = Arc::clone(source);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            Err(SourceError::Source {
                                message: "fetch limiter closed".to_string(),
                            }),
                        )
                    }
                };
                (index, source.fetch().await)
            });
        }

        let mut results: Vec<Option<Result<Vec<RawEvent>, SourceError>>> =
            (0..registry.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(e) => error!(error = %e, "fetch task panicked"),
            }
        }
        results
    }

    fn build_event(&self, source: &dyn EventSource, raw: &RawEvent) -> Result<Event, ParseError> {
        let hint = raw.timezone.as_deref().or(source.timezone());
        let input = RawTemporalInput {
            date_text: raw.date_text.clone(),
            time_text: raw.time_text.clone(),
            timezone_hint: hint.map(str::to_string),
            reference_year: self.reference_year,
        };
        let instant = self.normalizer.normalize(&input)?;

        let raw_date_text = match &raw.time_text {
            Some(time) => format!("{} {}", raw.date_text, time),
            None => raw.date_text.clone(),
        };
        let location_type = raw.location.as_deref().map(detect_location_type).unwrap_or_default();

        Ok(Event::new(source.name(), &raw.title, &raw.url, instant, &raw_date_text)
            .with_speakers(raw.speakers.as_deref().map(parse_speakers).unwrap_or_default())
            .with_location(location_type, raw.location.clone())
            .with_cost(raw.cost.as_deref().map(normalize_cost))
            .with_description(raw.description.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticSource {
        name: &'static str,
        timezone: Option<&'static str>,
        events: Vec<RawEvent>,
        fail: bool,
        enabled: bool,
    }

    impl StaticSource {
        fn new(name: &'static str, events: Vec<RawEvent>) -> Self {
            Self {
                name,
                timezone: Some("PT"),
                events,
                fail: false,
                enabled: true,
            }
        }
    }

    #[async_trait]
    impl EventSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn timezone(&self) -> Option<&str> {
            self.timezone
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
            if self.fail {
                return Err(SourceError::Source {
                    message: "site unreachable".to_string(),
                });
            }
            Ok(self.events.clone())
        }
    }

    fn raw(title: &str, date_text: &str, time_text: Option<&str>) -> RawEvent {
        RawEvent {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
            date_text: date_text.to_string(),
            time_text: time_text.map(str::to_string),
            ..RawEvent::default()
        }
    }

    fn window() -> DateWindow {
        DateWindow::fixed("2026-01-10", "2026-01-31").unwrap()
    }

    fn registry(sources: Vec<StaticSource>) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(Arc::new(source)).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_run_merges_sorts_and_filters() {
        let registry = registry(vec![
            StaticSource::new(
                "A",
                vec![
                    raw("Late", "January 28, 2026", Some("3:00pm")),
                    raw("Outside", "February 14, 2026", Some("3:00pm")),
                ],
            ),
            StaticSource::new("B", vec![raw("Early", "January 12, 2026", Some("9:00am"))]),
        ]);

        let report = Aggregator::new(window(), 2).run(&registry).await;
        let titles: Vec<_> = report.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Early", "Late"]);
        assert_eq!(report.sources[0].total_events, 2);
        assert_eq!(report.sources[0].in_range_events, 1);
        assert_eq!(report.sources[1].status, SourceStatus::Success);
    }

    #[tokio::test]
    async fn test_bad_dates_are_skipped_not_fatal() {
        let registry = registry(vec![StaticSource::new(
            "A",
            vec![
                raw("Good", "January 14, 2026", Some("12:00-1:00pm")),
                raw("Bad", "sometime soon", None),
                raw("Backwards", "January 15, 2026", Some("11:00pm-1:00am")),
            ],
        )]);

        let report = Aggregator::new(window(), 1).run(&registry).await;
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.sources[0].skipped, 2);
        assert_eq!(report.sources[0].status, SourceStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_and_disabled_sources_are_reported() {
        let mut failing = StaticSource::new("Broken", vec![]);
        failing.fail = true;
        let mut disabled = StaticSource::new("Off", vec![raw("Hidden", "January 14, 2026", None)]);
        disabled.enabled = false;

        let registry = registry(vec![
            failing,
            disabled,
            StaticSource::new("Ok", vec![raw("Shown", "January 14, 2026", Some("10:00am"))]),
        ]);

        let report = Aggregator::new(window(), 4).run(&registry).await;
        assert_eq!(report.sources[0].status, SourceStatus::Error);
        assert_eq!(report.sources[0].error_message.as_deref(), Some("Source error: site unreachable"));
        assert_eq!(report.sources[1].status, SourceStatus::Disabled);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.failed_sources().count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_listings_collapse_by_identity() {
        let registry = registry(vec![StaticSource::new(
            "A",
            vec![
                raw("Seminar", "January 14, 2026", Some("12:00pm")),
                raw("Seminar", "Jan 14, 2026", Some("12:00 p.m.")),
            ],
        )]);

        let report = Aggregator::new(window(), 1).run(&registry).await;
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_per_event_zone_overrides_source_default() {
        let mut listing = raw("Remote", "January 14, 2026", Some("12:00pm"));
        listing.timezone = Some("ET".to_string());
        let registry = registry(vec![StaticSource::new("A", vec![listing])]);

        let report = Aggregator::new(window(), 1).run(&registry).await;
        assert_eq!(report.events[0].format_date_range(), "January 14, 2026, 9:00am PST");
    }

    #[tokio::test]
    async fn test_missing_year_uses_reference_year() {
        let registry = registry(vec![StaticSource::new("A", vec![raw("Yearless", "Jan 20", Some("6pm"))])]);
        let report = Aggregator::new(window(), 1).with_reference_year(2026).run(&registry).await;
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].start.year(), 2026);
    }

    #[tokio::test]
    async fn test_custom_normalizer_applies_its_year_window() {
        let registry = registry(vec![StaticSource::new(
            "A",
            vec![raw("Next Year", "January 14, 2026", Some("6pm"))],
        )]);
        let strict = Normalizer::default().with_year_window(0);

        let report = Aggregator::new(window(), 1)
            .with_reference_year(2025)
            .with_normalizer(strict)
            .run(&registry)
            .await;
        assert!(report.events.is_empty());
        assert_eq!(report.skipped, 1);

        let report = Aggregator::new(window(), 1).with_reference_year(2025).run(&registry).await;
        assert_eq!(report.events.len(), 1);
    }

    struct SlowSource {
        name: String,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventSource for SlowSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn timezone(&self) -> Option<&str> {
            None
        }

        async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut registry = SourceRegistry::new();
        for i in 0..6 {
            registry
                .register(Arc::new(SlowSource {
                    name: format!("slow-{i}"),
                    active: Arc::clone(&active),
                    peak: Arc::clone(&peak),
                }))
                .unwrap();
        }

        let report = Aggregator::new(window(), 2).run(&registry).await;
        assert_eq!(report.sources.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_render_status_lists_every_source() {
        let registry = registry(vec![StaticSource::new("A", vec![raw("X", "January 14, 2026", Some("1pm"))])]);
        let report = Aggregator::new(window(), 1).run(&registry).await;
        let status = report.render_status();
        assert!(status.starts_with("1 events between January 10, 2026 to January 31, 2026"));
        assert!(status.contains("A [success]: 1 events, 1 in range"));
        assert!(report.render_listing().contains("A: X"));
    }
}
