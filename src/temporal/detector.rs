//! Format detection for free-form date text.
//!
//! Each recognized shape has its own pattern and they are tried in a fixed
//! order, so one format's separators never leak into another's reading: a
//! dotted `03.04.2026` is day-first, a slashed `03/04/2026` is month-first.

use std::ops::Range;

use chrono::{FixedOffset, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

const MONTH: &str = r"(?P<month>jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?";
const WEEKDAY: &str = r"(?P<weekday>mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:r(?:s(?:day)?)?)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)\b\.?";
const DAY: &str = r"(?P<day>\d{1,2})(?:st|nd|rd|th)?\b";
// Trailing day of a multi-day span ("March 3-5"); only the first day is kept
const DAY_SPAN: &str = r"(?:\s*[-–]\s*\d{1,2}(?:st|nd|rd|th)?\b)?";
const YEAR: &str = r"(?P<year>\d{4})\b";

/// The recognized date shapes, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DateShape {
    /// `2026-01-14T09:30:00-05:00`
    IsoDateTime,
    /// `2026-01-14`
    IsoDate,
    /// `14.01.2026`, day first
    Dotted,
    /// `01/14/2026`, month first
    UsSlash,
    /// `Tuesday, March 3` or `Wednesday, 20 August 2025`
    DayNameAnchored,
    /// `January 14, 2026`
    MonthDayYear,
    /// `14 January 2026`
    DayMonthYear,
    /// `Jan 14`, `March 3rd`
    MonthDay,
    /// `14 January`
    DayMonth,
}

impl DateShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateShape::IsoDateTime => "iso_datetime",
            DateShape::IsoDate => "iso_date",
            DateShape::Dotted => "dotted",
            DateShape::UsSlash => "us_slash",
            DateShape::DayNameAnchored => "day_name_anchored",
            DateShape::MonthDayYear => "month_day_year",
            DateShape::DayMonthYear => "day_month_year",
            DateShape::MonthDay => "month_day",
            DateShape::DayMonth => "day_month",
        }
    }
}

/// A UTC offset written literally in the text (`Z`, `+05:00`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitOffset {
    pub offset: FixedOffset,
    pub label: String,
}

/// Calendar fields pulled out of the text by a recognized shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDate {
    pub shape: DateShape,
    /// `None` when the shape carries no year
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
    pub weekday: Option<Weekday>,
    /// Only ISO date-times carry a time of day
    pub time: Option<NaiveTime>,
    pub offset: Option<ExplicitOffset>,
    pub matched: String,
    /// Byte range of `matched` within the detected text
    pub span: Range<usize>,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("date pattern compiles")
}

static PATTERNS: Lazy<Vec<(DateShape, Regex)>> = Lazy::new(|| {
    vec![
        (
            DateShape::IsoDateTime,
            compile(r"\b(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})T(?P<hour>\d{2}):(?P<minute>\d{2})(?::(?P<second>\d{2})(?:\.\d+)?)?(?P<offset>Z|[+-]\d{2}:?\d{2})?"),
        ),
        // A space separator needs seconds, so `2026-01-20 14:00-15:00` stays a date plus a range
        (
            DateShape::IsoDateTime,
            compile(r"\b(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2}) (?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})(?:\.\d+)?(?P<offset>Z|[+-]\d{2}:?\d{2})?"),
        ),
        (
            DateShape::IsoDate,
            compile(r"\b(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})\b"),
        ),
        (
            DateShape::Dotted,
            compile(r"\b(?P<day>\d{1,2})\.(?P<month>\d{1,2})\.(?P<year>\d{4}|\d{2})\b"),
        ),
        (
            DateShape::UsSlash,
            compile(r"\b(?P<month>\d{1,2})/(?P<day>\d{1,2})/(?P<year>\d{4}|\d{2})\b"),
        ),
        (
            DateShape::DayNameAnchored,
            compile(&format!(r"\b{WEEKDAY},?\s+{MONTH}\s+{DAY}{DAY_SPAN}(?:,?\s+{YEAR})?")),
        ),
        (
            DateShape::DayNameAnchored,
            compile(&format!(r"\b{WEEKDAY},?\s+{DAY}\s+(?:of\s+)?{MONTH}(?:,?\s+{YEAR})?")),
        ),
        (
            DateShape::MonthDayYear,
            compile(&format!(r"\b{MONTH}\s+{DAY}{DAY_SPAN},?\s+{YEAR}")),
        ),
        (
            DateShape::DayMonthYear,
            compile(&format!(r"\b{DAY}\s+(?:of\s+)?{MONTH},?\s+{YEAR}")),
        ),
        (DateShape::MonthDay, compile(&format!(r"\b{MONTH}\s+{DAY}"))),
        (DateShape::DayMonth, compile(&format!(r"\b{DAY}\s+(?:of\s+)?{MONTH}"))),
    ]
});

/// Classify `text` into one of the recognized shapes.
///
/// Returns `None` when nothing matches; the caller decides whether to try the
/// generic fallback or give up.
pub fn detect(text: &str) -> Option<DetectedDate> {
    PATTERNS
        .iter()
        .find_map(|(shape, regex)| regex.captures(text).and_then(|caps| from_captures(*shape, &caps)))
}

fn from_captures(shape: DateShape, caps: &Captures<'_>) -> Option<DetectedDate> {
    let whole = caps.get(0)?;

    let month_text = caps.name("month")?.as_str();
    let month = if month_text.chars().all(|c| c.is_ascii_digit()) {
        month_text.parse().ok()?
    } else {
        month_from_name(month_text)?
    };
    let day: u32 = caps.name("day")?.as_str().parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let year = match caps.name("year") {
        Some(y) => Some(y.as_str().parse::<i32>().ok()?),
        None => None,
    };

    let weekday = caps.name("weekday").and_then(|w| weekday_from_name(w.as_str()));

    let time = match (caps.name("hour"), caps.name("minute")) {
        (Some(h), Some(m)) => {
            let second = caps
                .name("second")
                .map(|s| s.as_str().parse().unwrap_or(0))
                .unwrap_or(0);
            // An impossible clock reading disqualifies the whole date-time match
            Some(NaiveTime::from_hms_opt(
                h.as_str().parse().ok()?,
                m.as_str().parse().ok()?,
                second,
            )?)
        }
        _ => None,
    };

    let offset = match caps.name("offset") {
        Some(o) => Some(parse_offset_literal(o.as_str())?),
        None => None,
    };

    Some(DetectedDate {
        shape,
        year,
        month,
        day,
        weekday,
        time,
        offset,
        matched: whole.as_str().to_string(),
        span: whole.range(),
    })
}

/// Month number from a full or abbreviated English month name
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    let weekday = match lower.get(..3)? {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Parse `Z`, `+05:00` or `-0430` into a fixed offset
pub fn parse_offset_literal(literal: &str) -> Option<ExplicitOffset> {
    if literal.eq_ignore_ascii_case("z") {
        return Some(ExplicitOffset {
            offset: FixedOffset::east_opt(0)?,
            label: "Z".to_string(),
        });
    }

    let (sign, rest) = match literal.as_bytes().first()? {
        b'+' => (1, &literal[1..]),
        b'-' => (-1, &literal[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some(ExplicitOffset {
        offset,
        label: literal.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_iso_date() {
        let d = detect("2026-01-20").unwrap();
        assert_eq!(d.shape, DateShape::IsoDate);
        assert_eq!((d.year, d.month, d.day), (Some(2026), 1, 20));
        assert!(d.time.is_none());
    }

    #[test]
    fn test_detect_iso_datetime_with_offset() {
        let d = detect("2026-03-10T09:30:00-05:00").unwrap();
        assert_eq!(d.shape, DateShape::IsoDateTime);
        assert_eq!(d.time, NaiveTime::from_hms_opt(9, 30, 0));
        let offset = d.offset.unwrap();
        assert_eq!(offset.offset.local_minus_utc(), -5 * 3600);
        assert_eq!(offset.label, "-05:00");
    }

    #[test]
    fn test_detect_iso_datetime_zulu() {
        let d = detect("2026-03-10T17:00Z").unwrap();
        assert_eq!(d.offset.unwrap().offset.local_minus_utc(), 0);
    }

    #[test]
    fn test_detect_space_separated_iso_datetime() {
        let d = detect("2026-01-14 09:30:00-05:00").unwrap();
        assert_eq!(d.shape, DateShape::IsoDateTime);
        assert_eq!(d.time, NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(d.offset.unwrap().offset.local_minus_utc(), -5 * 3600);
        assert_eq!(d.matched, "2026-01-14 09:30:00-05:00");
    }

    #[test]
    fn test_iso_date_with_spaced_time_range_leaves_range_alone() {
        let d = detect("2026-01-20 14:00-15:00").unwrap();
        assert_eq!(d.shape, DateShape::IsoDate);
        assert_eq!(d.matched, "2026-01-20");
    }

    #[test]
    fn test_dotted_is_day_first() {
        let d = detect("03.04.2026").unwrap();
        assert_eq!(d.shape, DateShape::Dotted);
        assert_eq!((d.year, d.month, d.day), (Some(2026), 4, 3));
    }

    #[test]
    fn test_slash_is_month_first() {
        let d = detect("03/04/2026").unwrap();
        assert_eq!(d.shape, DateShape::UsSlash);
        assert_eq!((d.year, d.month, d.day), (Some(2026), 3, 4));
    }

    #[test]
    fn test_two_digit_year_is_kept_literal() {
        let d = detect("03/04/26").unwrap();
        assert_eq!(d.year, Some(26));
    }

    #[test]
    fn test_day_name_anchored() {
        let d = detect("Tuesday, March 3").unwrap();
        assert_eq!(d.shape, DateShape::DayNameAnchored);
        assert_eq!((d.year, d.month, d.day), (None, 3, 3));
        assert_eq!(d.weekday, Some(Weekday::Tue));

        let d = detect("Wednesday, 20 August 2025").unwrap();
        assert_eq!(d.shape, DateShape::DayNameAnchored);
        assert_eq!((d.year, d.month, d.day), (Some(2025), 8, 20));
    }

    #[test]
    fn test_month_day_year_variants() {
        for text in ["January 14, 2026", "Jan 14 2026", "Jan. 14th, 2026", "January 14-16, 2026"] {
            let d = detect(text).unwrap();
            assert_eq!(d.shape, DateShape::MonthDayYear, "{text}");
            assert_eq!((d.year, d.month, d.day), (Some(2026), 1, 14), "{text}");
        }
    }

    #[test]
    fn test_month_day_year_with_trailing_time() {
        let d = detect("January 14, 2026, 12:00-1:00pm PST").unwrap();
        assert_eq!(d.shape, DateShape::MonthDayYear);
        assert_eq!(d.matched, "January 14, 2026");
    }

    #[test]
    fn test_day_month_year() {
        let d = detect("14 January 2026").unwrap();
        assert_eq!(d.shape, DateShape::DayMonthYear);
        assert_eq!((d.year, d.month, d.day), (Some(2026), 1, 14));
    }

    #[test]
    fn test_bare_month_day_has_no_year() {
        let d = detect("Jan 14th").unwrap();
        assert_eq!(d.shape, DateShape::MonthDay);
        assert_eq!((d.year, d.month, d.day), (None, 1, 14));

        // A clock time after the day is not mistaken for a year
        let d = detect("Sept 9, 12:00pm").unwrap();
        assert_eq!(d.shape, DateShape::MonthDay);
        assert_eq!((d.month, d.day), (9, 9));
    }

    #[test]
    fn test_day_month() {
        let d = detect("14 March").unwrap();
        assert_eq!(d.shape, DateShape::DayMonth);
        assert_eq!((d.month, d.day), (3, 14));
    }

    #[test]
    fn test_unrecognized() {
        assert!(detect("not a date at all xyz").is_none());
        assert!(detect("13.31.2026").is_none());
        assert!(detect("2.15pm").is_none());
    }

    #[test]
    fn test_span_points_at_matched_text() {
        let text = "Event on 2026-01-20 at noon";
        let d = detect(text).unwrap();
        assert_eq!(&text[d.span.clone()], "2026-01-20");
    }

    #[test]
    fn test_parse_offset_literal() {
        assert_eq!(parse_offset_literal("+0530").unwrap().offset.local_minus_utc(), 5 * 3600 + 1800);
        assert!(parse_offset_literal("+25:00").is_none());
        assert!(parse_offset_literal("05:00").is_none());
    }
}
