//! Timezone abbreviation table and offset resolution.
//!
//! Site authors write the abbreviation they mean ("EDT", not "ET in summer"),
//! so specific abbreviations map to fixed offsets. Only the generic names
//! (ET, CT, MT, PT, AKT) carry a daylight rule, evaluated on the local date
//! being parsed.

use std::collections::HashMap;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::detector::{parse_offset_literal, ExplicitOffset};
use crate::common::error::{ParseError, Result};

/// How an abbreviation maps to a UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneRule {
    Fixed { offset_minutes: i32 },
    /// Standard offset, plus one hour while US daylight time is in effect
    UsDaylight { standard_minutes: i32 },
}

impl ZoneRule {
    /// Offset in minutes east of UTC for a wall-clock time in this zone
    pub fn offset_minutes_at(&self, local: NaiveDateTime) -> i32 {
        match *self {
            ZoneRule::Fixed { offset_minutes } => offset_minutes,
            ZoneRule::UsDaylight { standard_minutes } => {
                if us_daylight_active(local) {
                    standard_minutes + 60
                } else {
                    standard_minutes
                }
            }
        }
    }

    pub fn offset_at(&self, local: NaiveDateTime) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.offset_minutes_at(local) * 60)
    }
}

/// US daylight time: second Sunday in March 02:00 until first Sunday in
/// November 02:00, local wall time.
fn us_daylight_active(local: NaiveDateTime) -> bool {
    let year = local.year();
    let boundary = |month: u32, nth: u8| {
        NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, nth)
            .and_then(|d| d.and_hms_opt(2, 0, 0))
    };
    match (boundary(3, 2), boundary(11, 1)) {
        (Some(start), Some(end)) => local >= start && local < end,
        _ => false,
    }
}

/// Immutable abbreviation -> rule map; safe to share across threads
#[derive(Debug, Clone)]
pub struct TimezoneTable {
    entries: HashMap<&'static str, ZoneRule>,
}

impl TimezoneTable {
    pub fn standard() -> Self {
        use ZoneRule::{Fixed, UsDaylight};

        let entries = HashMap::from([
            ("ET", UsDaylight { standard_minutes: -300 }),
            ("EST", Fixed { offset_minutes: -300 }),
            ("EDT", Fixed { offset_minutes: -240 }),
            ("CT", UsDaylight { standard_minutes: -360 }),
            ("CST", Fixed { offset_minutes: -360 }),
            ("CDT", Fixed { offset_minutes: -300 }),
            ("MT", UsDaylight { standard_minutes: -420 }),
            ("MST", Fixed { offset_minutes: -420 }),
            ("MDT", Fixed { offset_minutes: -360 }),
            ("PT", UsDaylight { standard_minutes: -480 }),
            ("PST", Fixed { offset_minutes: -480 }),
            ("PDT", Fixed { offset_minutes: -420 }),
            ("AKT", UsDaylight { standard_minutes: -540 }),
            ("AKST", Fixed { offset_minutes: -540 }),
            ("AKDT", Fixed { offset_minutes: -480 }),
            ("HST", Fixed { offset_minutes: -600 }),
            ("GMT", Fixed { offset_minutes: 0 }),
            ("UTC", Fixed { offset_minutes: 0 }),
            ("BST", Fixed { offset_minutes: 60 }),
            ("CET", Fixed { offset_minutes: 60 }),
            ("CEST", Fixed { offset_minutes: 120 }),
        ]);
        Self { entries }
    }

    pub fn get(&self, abbreviation: &str) -> Option<ZoneRule> {
        self.entries
            .get(abbreviation.trim().to_ascii_uppercase().as_str())
            .copied()
    }

    pub fn contains(&self, abbreviation: &str) -> bool {
        self.get(abbreviation).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TimezoneTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Process-wide table, built on first use and read-only thereafter
pub static TIMEZONES: Lazy<TimezoneTable> = Lazy::new(TimezoneTable::standard);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OffsetSource {
    /// A literal offset in the text (`+05:00`, `Z`, `UTC+2`)
    Explicit,
    /// A table abbreviation found in the text
    Abbreviation,
    /// The source's default, supplied by the caller
    Hint,
    /// Nothing named a zone; only used for date-only listings
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOffset {
    pub offset: FixedOffset,
    /// The abbreviation or offset literal actually used
    pub label: String,
    pub source: OffsetSource,
}

static UTC_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:UTC|GMT)\s*([+-])(\d{1,2})(?::?(\d{2}))?\b").expect("offset pattern compiles")
});
static UPPER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,5}\b").expect("token pattern compiles"));

/// Upper-case words that show up in date text but are never zones
const NOT_A_ZONE: &[&str] = &[
    "AM", "PM", "NOON", "TBA", "TBD", "AND", "THE", "TO", "AT", "ON", "OF", "FROM", "UNTIL",
    "ST", "ND", "RD", "TH", "JAN", "FEB", "MAR", "MARCH", "APR", "APRIL", "MAY", "JUN", "JUNE",
    "JUL", "JULY", "AUG", "SEP", "SEPT", "OCT", "NOV", "DEC", "MON", "TUE", "TUES", "WED", "THU",
    "THUR", "THURS", "FRI", "SAT", "SUN",
];

/// Look for `UTC+2`, `GMT-05:00` style offsets in free text
pub fn find_utc_offset(text: &str) -> Option<ExplicitOffset> {
    let caps = UTC_OFFSET.captures(text)?;
    let sign = if &caps[1] == "-" { -1 } else { 1 };
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some(ExplicitOffset {
        offset,
        label: caps[0].to_ascii_uppercase().replace(' ', ""),
    })
}

/// Resolve one abbreviation or offset string, as used for hints
fn resolve_token(
    table: &TimezoneTable,
    token: &str,
    local: NaiveDateTime,
) -> Option<(FixedOffset, String)> {
    let token = token.trim();
    if let Some(rule) = table.get(token) {
        return Some((rule.offset_at(local)?, token.to_ascii_uppercase()));
    }
    find_utc_offset(token)
        .or_else(|| parse_offset_literal(token))
        .map(|explicit| (explicit.offset, explicit.label))
}

/// Pick the offset to interpret a wall-clock time in.
///
/// Order: a literal offset, then a known abbreviation in `text`, then the
/// caller's `hint`. An unknown abbreviation is never silently defaulted:
/// without a usable hint it fails as ambiguous.
pub fn resolve(
    table: &TimezoneTable,
    explicit: Option<&ExplicitOffset>,
    text: &str,
    hint: Option<&str>,
    local: NaiveDateTime,
) -> Result<ResolvedOffset> {
    if let Some(explicit) = explicit.cloned().or_else(|| find_utc_offset(text)) {
        return Ok(ResolvedOffset {
            offset: explicit.offset,
            label: explicit.label,
            source: OffsetSource::Explicit,
        });
    }

    let mut unknown: Option<String> = None;
    for token in UPPER_TOKEN.find_iter(text).map(|m| m.as_str()) {
        if NOT_A_ZONE.contains(&token) {
            continue;
        }
        match table.get(token).and_then(|rule| rule.offset_at(local)) {
            Some(offset) => {
                return Ok(ResolvedOffset {
                    offset,
                    label: token.to_string(),
                    source: OffsetSource::Abbreviation,
                })
            }
            None => {
                unknown.get_or_insert_with(|| token.to_string());
            }
        }
    }

    if let Some(hint) = hint.filter(|h| !h.trim().is_empty()) {
        if let Some(token) = &unknown {
            debug!(token = %token, hint = %hint, "unknown zone token, falling back to hint");
        }
        return match resolve_token(table, hint, local) {
            Some((offset, label)) => Ok(ResolvedOffset {
                offset,
                label,
                source: OffsetSource::Hint,
            }),
            None => Err(ParseError::AmbiguousTimezone {
                token: Some(hint.trim().to_string()),
            }),
        };
    }

    Err(ParseError::AmbiguousTimezone { token: unknown })
}
