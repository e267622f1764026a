//! Time-of-day and time-range extraction, independent of the calendar date.

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::common::error::{ParseError, Result};

/// Whether the am/pm reading of a match was written, guessed or not needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeridiemSource {
    Explicit,
    /// One side of a range lacked am/pm and borrowed it from the other
    Inferred,
    TwentyFourHour,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    /// Absent for single times; never fabricated
    pub end: Option<NaiveTime>,
    pub meridiem: MeridiemSource,
    pub matched: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    fn parse(text: &str) -> Option<Meridiem> {
        match text {
            "am" => Some(Meridiem::Am),
            "pm" => Some(Meridiem::Pm),
            _ => None,
        }
    }

    fn flip(self) -> Meridiem {
        match self {
            Meridiem::Am => Meridiem::Pm,
            Meridiem::Pm => Meridiem::Am,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

impl Clock {
    fn to_time(self, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
        if self.minute > 59 {
            return None;
        }
        let hour = match meridiem {
            Some(m) => {
                if !(1..=12).contains(&self.hour) {
                    return None;
                }
                match (m, self.hour) {
                    (Meridiem::Am, 12) => 0,
                    (Meridiem::Pm, 12) => 12,
                    (Meridiem::Pm, h) => h + 12,
                    (Meridiem::Am, h) => h,
                }
            }
            None => self.hour,
        };
        NaiveTime::from_hms_opt(hour, self.minute, 0)
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("time pattern compiles")
}

// `p.m.` directly after a digit has no word boundary in front of it
static SPACED_MERIDIEM: Lazy<Regex> = Lazy::new(|| compile(r"(\d|\b)\s?([ap])\.\s?m\b\.?"));
static NOON: Lazy<Regex> = Lazy::new(|| compile(r"\b(?:12(?::00)?\s*)?noon\b"));
static MIDNIGHT: Lazy<Regex> = Lazy::new(|| compile(r"\b(?:12(?::00)?\s*)?midnight\b"));
static DOTTED_MERIDIEM: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{1,2})\.([0-5]\d)\s*([ap]m)\b"));
static DOTTED_RANGE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d{1,2})\.([0-5]\d)\s*(?:-|to)\s*(\d{1,2})\.([0-5]\d)\b"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

/// `12:00-1:00pm`, `9am to 11am`, `1:00 - 2pm`: the end carries am/pm
static RANGE_MARKED: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(\d{1,2})(?::(\d{2}))?\s*([ap]m)?\s*(?:-|to|until)\s*(\d{1,2})(?::(\d{2}))?\s*([ap]m)\b")
});
/// `16:00-17:00`, `11:00am-1:00`: minutes on both sides, end unmarked
static RANGE_CLOCK: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d{1,2}):(\d{2})\s*([ap]m)?\s*(?:-|to|until)\s*(\d{1,2}):(\d{2})\b"));
/// `2:30pm`, `7 pm`
static SINGLE_MARKED: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{1,2})(?::(\d{2}))?\s*([ap]m)\b"));
/// `19:30`
static SINGLE_CLOCK: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{1,2}):(\d{2})\b"));

/// Rewrite informal spellings into the forms the patterns expect.
pub fn prepare(text: &str) -> String {
    let lowered = text
        .to_lowercase()
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{a0}', " ");
    let s = SPACED_MERIDIEM.replace_all(&lowered, "${1}${2}m");
    let s = NOON.replace_all(&s, "12:00pm");
    let s = MIDNIGHT.replace_all(&s, "12:00am");
    let s = DOTTED_MERIDIEM.replace_all(&s, "$1:$2$3");
    let s = DOTTED_RANGE.replace_all(&s, "$1:$2-$3:$4");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Find a start time and optional end time in `text`.
///
/// `Ok(None)` means no time was written at all; callers default the time
/// and record the listing as date-only. A match whose numbers cannot be a
/// clock reading (`25:00`, `13pm`) is an error.
pub fn extract_time_range(text: &str) -> Result<Option<TimeRange>> {
    let prepared = prepare(text);

    if let Some(caps) = RANGE_MARKED.captures(&prepared) {
        let start = clock(&caps, 1, 2, 3);
        let end = clock(&caps, 4, 5, 6);
        return resolve_range(&caps, start, end).map(Some);
    }

    if let Some(caps) = RANGE_CLOCK.captures(&prepared) {
        let start = clock(&caps, 1, 2, 3);
        let end = Clock {
            hour: number(&caps, 4),
            minute: number(&caps, 5),
            meridiem: None,
        };
        return resolve_range(&caps, start, end).map(Some);
    }

    if let Some(caps) = SINGLE_MARKED.captures(&prepared) {
        let single = clock(&caps, 1, 2, 3);
        let start = single.to_time(single.meridiem).ok_or_else(|| invalid(&caps))?;
        return Ok(Some(TimeRange {
            start,
            end: None,
            meridiem: MeridiemSource::Explicit,
            matched: caps[0].to_string(),
        }));
    }

    if let Some(caps) = SINGLE_CLOCK.captures(&prepared) {
        let single = clock(&caps, 1, 2, 0);
        let start = single.to_time(None).ok_or_else(|| invalid(&caps))?;
        return Ok(Some(TimeRange {
            start,
            end: None,
            meridiem: MeridiemSource::TwentyFourHour,
            matched: caps[0].to_string(),
        }));
    }

    Ok(None)
}

fn number(caps: &Captures<'_>, group: usize) -> u32 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

// Group 0 never names a meridiem, so it doubles as "no meridiem group"
fn clock(caps: &Captures<'_>, hour: usize, minute: usize, meridiem: usize) -> Clock {
    let meridiem = if meridiem == 0 {
        None
    } else {
        caps.get(meridiem).and_then(|m| Meridiem::parse(m.as_str()))
    };
    Clock {
        hour: number(caps, hour),
        minute: number(caps, minute),
        meridiem,
    }
}

fn invalid(caps: &Captures<'_>) -> ParseError {
    ParseError::InvalidTime {
        text: caps[0].to_string(),
    }
}

fn resolve_range(caps: &Captures<'_>, start: Clock, end: Clock) -> Result<TimeRange> {
    let (start_time, end_time, source) = match (start.meridiem, end.meridiem) {
        (Some(_), Some(_)) => (
            start.to_time(start.meridiem),
            end.to_time(end.meridiem),
            MeridiemSource::Explicit,
        ),
        (None, None) => (start.to_time(None), end.to_time(None), MeridiemSource::TwentyFourHour),
        (None, Some(known)) => {
            let end_time = end.to_time(Some(known));
            (borrow_meridiem(start, known, end_time, true), end_time, MeridiemSource::Inferred)
        }
        (Some(known), None) => {
            let start_time = start.to_time(Some(known));
            (start_time, borrow_meridiem(end, known, start_time, false), MeridiemSource::Inferred)
        }
    };

    match (start_time, end_time) {
        (Some(start), Some(end)) => Ok(TimeRange {
            start,
            end: Some(end),
            meridiem: source,
            matched: caps[0].to_string(),
        }),
        _ => Err(invalid(caps)),
    }
}

/// Read an unmarked side of a range using the other side's am/pm, flipping
/// it when the borrowed reading would put the range out of order. A side
/// that cannot take am/pm at all (`13:00`) is read as 24-hour.
fn borrow_meridiem(
    side: Clock,
    known: Meridiem,
    other: Option<NaiveTime>,
    side_is_start: bool,
) -> Option<NaiveTime> {
    let Some(same) = side.to_time(Some(known)) else {
        return side.to_time(None);
    };
    let Some(other) = other else {
        return Some(same);
    };
    let out_of_order = if side_is_start { same > other } else { same < other };
    if out_of_order {
        side.to_time(Some(known.flip())).or(Some(same))
    } else {
        Some(same)
    }
}
