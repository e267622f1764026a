use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::constants::{EVENT_ID_NAMESPACE, TARGET_LABEL};
use crate::temporal::{target_offset, Confidence, DateWindow, NormalizedInstant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocationType {
    Virtual,
    #[serde(rename = "In-Person")]
    InPerson,
    Hybrid,
    #[default]
    Unknown,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Virtual => "Virtual",
            LocationType::InPerson => "In-Person",
            LocationType::Hybrid => "Hybrid",
            LocationType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized listing, ready for filtering and display.
///
/// Identity is the v5 id derived from source, title and start; two records
/// with the same id are the same event even if their details differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub source: String,
    pub start: DateTime<FixedOffset>,
    pub end: Option<DateTime<FixedOffset>>,
    pub speakers: Vec<String>,
    pub location_type: LocationType,
    pub location_details: Option<String>,
    pub cost: Option<String>,
    pub description: Option<String>,
    pub confidence: Confidence,
    pub scraped_at: DateTime<Utc>,
    /// Date text exactly as the source wrote it
    pub raw_date_text: String,
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl Event {
    pub fn new(
        source: &str,
        title: &str,
        url: &str,
        instant: NormalizedInstant,
        raw_date_text: &str,
    ) -> Self {
        let source = source.trim().to_string();
        let title = title.trim().to_string();
        let start = instant.start.with_timezone(&target_offset());
        Self {
            id: event_id(&source, &title, &start),
            url: url.trim().to_string(),
            end: instant.end.map(|e| e.with_timezone(&target_offset())),
            confidence: instant.confidence,
            scraped_at: Utc::now(),
            raw_date_text: raw_date_text.to_string(),
            speakers: Vec::new(),
            location_type: LocationType::Unknown,
            location_details: None,
            cost: None,
            description: None,
            source,
            title,
            start,
        }
    }

    pub fn with_speakers<I, S>(mut self, speakers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.speakers = speakers
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_location(mut self, location_type: LocationType, details: Option<String>) -> Self {
        self.location_type = location_type;
        self.location_details = non_blank(details);
        self
    }

    pub fn with_cost(mut self, cost: Option<String>) -> Self {
        self.cost = non_blank(cost);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    /// `January 14, 2026, 12:00-1:00pm PST` or `January 14, 2026, 12:00pm PST`
    pub fn format_date_range(&self) -> String {
        let start = self.start.with_timezone(&target_offset());
        let date = start.format("%B %d, %Y");
        let start_clock = start.format("%I:%M").to_string();
        let start_clock = start_clock.trim_start_matches('0');

        match self.end {
            Some(end) => {
                let end_clock = end.with_timezone(&target_offset()).format("%I:%M%p").to_string().to_lowercase();
                format!("{date}, {start_clock}-{} {TARGET_LABEL}", end_clock.trim_start_matches('0'))
            }
            None => {
                let meridiem = start.format("%p").to_string().to_lowercase();
                format!("{date}, {start_clock}{meridiem} {TARGET_LABEL}")
            }
        }
    }

    pub fn format_cost(&self) -> String {
        match self.cost.as_deref() {
            None => "free".to_string(),
            Some(cost) if ["free", "0", "$0", "$0.00"].contains(&cost.to_lowercase().as_str()) => {
                "free".to_string()
            }
            Some(cost) => cost.to_string(),
        }
    }

    pub fn format_location(&self) -> String {
        match (self.location_type, self.location_details.as_deref()) {
            (LocationType::Virtual, _) => "Virtual".to_string(),
            (LocationType::InPerson, Some(details)) => details.to_string(),
            (LocationType::InPerson, None) => "In-Person".to_string(),
            (LocationType::Hybrid, Some(details)) => format!("Hybrid - {details}"),
            (LocationType::Hybrid, None) => "Hybrid".to_string(),
            (LocationType::Unknown, _) => "TBD".to_string(),
        }
    }

    /// Three-line text listing: source and title, link, then when/where/cost
    pub fn to_display_string(&self) -> String {
        let speakers = if self.speakers.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.speakers.join(", "))
        };
        format!(
            "\t\u{2022}\t{}: {}{}\n{}\n{}, {} ({})",
            self.source,
            self.title,
            speakers,
            self.url,
            self.format_date_range(),
            self.format_location(),
            self.format_cost()
        )
    }

    pub fn is_within(&self, window: &DateWindow) -> bool {
        window.contains(&self.start)
    }
}

/// Stable id for deduplication across runs and sources
pub fn event_id(source: &str, title: &str, start: &DateTime<FixedOffset>) -> Uuid {
    let key = format!("{source}|{title}|{}", start.to_rfc3339());
    Uuid::new_v5(&EVENT_ID_NAMESPACE, key.as_bytes())
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pst(d: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        target_offset().with_ymd_and_hms(2026, 1, d, h, m, 0).unwrap()
    }

    fn instant(start: DateTime<FixedOffset>, end: Option<DateTime<FixedOffset>>) -> NormalizedInstant {
        NormalizedInstant {
            start,
            end,
            source_timezone: "PST".to_string(),
            confidence: Confidence::Exact,
        }
    }

    fn sample() -> Event {
        Event::new(
            "Harvard HSPH",
            "  Causal Inference Seminar ",
            " https://example.com/e/1 ",
            instant(pst(14, 12, 0), Some(pst(14, 13, 0))),
            "January 14, 2026, 12:00-1:00pm PST",
        )
    }

    #[test]
    fn test_new_trims_fields() {
        let event = sample().with_speakers(["  Jane Doe ", "", "   ", "John Roe"]);
        assert_eq!(event.title, "Causal Inference Seminar");
        assert_eq!(event.url, "https://example.com/e/1");
        assert_eq!(event.speakers, vec!["Jane Doe", "John Roe"]);
    }

    #[test]
    fn test_start_is_held_in_target_offset() {
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap().with_ymd_and_hms(2026, 1, 14, 15, 0, 0).unwrap();
        let event = Event::new("S", "T", "u", instant(eastern, None), "");
        assert_eq!(event.start, pst(14, 12, 0));
        assert_eq!(event.start.offset().local_minus_utc(), -8 * 3600);
    }

    #[test]
    fn test_format_date_range() {
        assert_eq!(sample().format_date_range(), "January 14, 2026, 12:00-1:00pm PST");

        let single = Event::new("S", "T", "u", instant(pst(5, 9, 30), None), "");
        assert_eq!(single.format_date_range(), "January 05, 2026, 9:30am PST");
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(sample().format_cost(), "free");
        assert_eq!(sample().with_cost(Some("$0".into())).format_cost(), "free");
        assert_eq!(sample().with_cost(Some("   ".into())).format_cost(), "free");
        assert_eq!(sample().with_cost(Some("$50".into())).format_cost(), "$50");
    }

    #[test]
    fn test_format_location() {
        let event = sample();
        assert_eq!(event.format_location(), "TBD");
        assert_eq!(event.clone().with_location(LocationType::Virtual, Some("Zoom".into())).format_location(), "Virtual");
        assert_eq!(event.clone().with_location(LocationType::InPerson, None).format_location(), "In-Person");
        assert_eq!(
            event.clone().with_location(LocationType::InPerson, Some("Boston, MA".into())).format_location(),
            "Boston, MA"
        );
        assert_eq!(
            event.with_location(LocationType::Hybrid, Some("Boston, MA".into())).format_location(),
            "Hybrid - Boston, MA"
        );
    }

    #[test]
    fn test_display_string() {
        let event = sample()
            .with_speakers(["Jane Doe", "John Roe"])
            .with_location(LocationType::Virtual, None);
        assert_eq!(
            event.to_display_string(),
            "\t\u{2022}\tHarvard HSPH: Causal Inference Seminar (Jane Doe, John Roe)\n\
             https://example.com/e/1\n\
             January 14, 2026, 12:00-1:00pm PST, Virtual (free)"
        );
    }

    #[test]
    fn test_identity_is_stable() {
        let a = sample();
        let b = sample().with_cost(Some("$10".into()));
        assert_eq!(a.id, b.id);
        assert_eq!(a, b);

        let other = Event::new("Harvard HSPH", "Causal Inference Seminar", "u", instant(pst(15, 12, 0), None), "");
        assert_ne!(a.id, other.id);
    }

    #[test]
    fn test_ordering_is_chronological_then_title() {
        let late = Event::new("S", "A", "u", instant(pst(20, 9, 0), None), "");
        let early_b = Event::new("S", "B", "u", instant(pst(10, 9, 0), None), "");
        let early_a = Event::new("S", "A", "u", instant(pst(10, 9, 0), None), "");
        let mut events = vec![late.clone(), early_b.clone(), early_a.clone()];
        events.sort();
        assert_eq!(events, vec![early_a, early_b, late]);
    }

    #[test]
    fn test_is_within_window() {
        let window = DateWindow::fixed("2026-01-14", "2026-01-14").unwrap();
        assert!(sample().is_within(&window));
        let outside = Event::new("S", "T", "u", instant(pst(15, 0, 0), None), "");
        assert!(!outside.is_within(&window));
    }
}
