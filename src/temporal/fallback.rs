//! Permissive last-resort parsing for text no detector shape recognized.
//!
//! Leans on chrono's own parsers: RFC 3339 / RFC 2822 on the raw text, then a
//! fixed list of `strftime` layouts on the text with clock times removed.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::detector::ExplicitOffset;

const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b-%d-%Y",
    "%d %b %Y",
    "%Y %B %d",
    "%Y %b %d",
    "%A %d %B %Y",
    "%a %d %b %Y",
];

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}(?::\d{2}){1,2}\s*(?:[ap]\.?m\.?)?|\b\d{1,2}\s*[ap]\.?m\.?")
        .expect("clock pattern compiles")
});
static FILLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:at|from|on)\b|@|,").expect("filler pattern compiles"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDate {
    pub date: NaiveDate,
    /// Only set when an RFC layout carried a full timestamp
    pub time: Option<NaiveTime>,
    pub offset: Option<ExplicitOffset>,
}

fn from_timestamp(dt: DateTime<FixedOffset>) -> FallbackDate {
    FallbackDate {
        date: dt.date_naive(),
        time: Some(dt.time()),
        offset: Some(ExplicitOffset {
            offset: *dt.offset(),
            label: dt.offset().to_string(),
        }),
    }
}

/// Best-effort parse; `None` means the text really is unrecognizable
pub fn parse_generic(text: &str) -> Option<FallbackDate> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(from_timestamp(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(from_timestamp(dt));
    }

    let without_time = CLOCK_TIME.replace_all(trimmed, " ");
    let without_filler = FILLER.replace_all(&without_time, " ");
    let cleaned = WHITESPACE.replace_all(&without_filler, " ").trim().to_string();
    if cleaned.is_empty() {
        return None;
    }

    let found = DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&cleaned, fmt)
            .ok()
            .map(|date| (*fmt, date))
    });
    match found {
        Some((fmt, date)) => {
            debug!(text = %trimmed, format = fmt, "generic fallback parsed date");
            Some(FallbackDate {
                date,
                time: None,
                offset: None,
            })
        }
        None => None,
    }
}
