//! Temporal normalization
//!
//! Turns the free-form date and time fragments harvested from event listings
//! into a single comparable instant in the fixed target offset. The pieces run
//! in order: the detector classifies the date text, the time-range extractor
//! pulls clock times, the timezone resolver picks an offset, and the
//! normalizer combines them.

pub mod detector;
pub mod fallback;
pub mod normalizer;
pub mod time_range;
pub mod timezone;
pub mod window;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::common::constants::TARGET_OFFSET_SECONDS;

pub use normalizer::{normalize, Normalizer};
pub use timezone::{TimezoneTable, TIMEZONES};
pub use window::DateWindow;

/// The fixed offset all normalized instants are expressed in (UTC-8, no DST)
pub fn target_offset() -> FixedOffset {
    FixedOffset::east_opt(TARGET_OFFSET_SECONDS).expect("target offset is within a day")
}

/// Raw fragments handed over by a source for one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTemporalInput {
    pub date_text: String,
    /// May be absent when the time is embedded in `date_text`
    pub time_text: Option<String>,
    /// Per-source default, used when the text names no zone
    pub timezone_hint: Option<String>,
    /// Substituted when the date text omits a year
    pub reference_year: i32,
}

impl RawTemporalInput {
    pub fn new(date_text: impl Into<String>, reference_year: i32) -> Self {
        Self {
            date_text: date_text.into(),
            time_text: None,
            timezone_hint: None,
            reference_year,
        }
    }

    pub fn with_time(mut self, time_text: impl Into<String>) -> Self {
        self.time_text = Some(time_text.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.timezone_hint = Some(hint.into());
        self
    }
}

/// How much inference went into a normalized instant.
///
/// Variants are ordered from least to most inferred; when several apply the
/// result carries the greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Exact,
    InferredYear,
    InferredTimezone,
    DateOnly,
}

impl Confidence {
    /// Lower the confidence to `other` if it is a stronger inference
    pub fn downgrade(self, other: Confidence) -> Confidence {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Exact => "exact",
            Confidence::InferredYear => "inferred_year",
            Confidence::InferredTimezone => "inferred_timezone",
            Confidence::DateOnly => "date_only",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical result of normalizing one listing's date/time text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedInstant {
    /// Always in the target offset
    pub start: DateTime<FixedOffset>,
    /// Present only when a range was detected; never before `start`
    pub end: Option<DateTime<FixedOffset>>,
    /// The abbreviation or offset the text was interpreted in
    pub source_timezone: String,
    pub confidence: Confidence,
}
