use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tracing::{debug, warn};

use super::detector::{self, ExplicitOffset};
use super::fallback;
use super::time_range::{self, TimeRange};
use super::timezone::{self, OffsetSource, ResolvedOffset, TimezoneTable, TIMEZONES};
use super::{target_offset, Confidence, NormalizedInstant, RawTemporalInput};
use crate::common::constants::{DEFAULT_YEAR_WINDOW, TARGET_LABEL};
use crate::common::error::{ParseError, Result};

/// Calendar fields settled before any clock time is applied
struct CalendarDate {
    date: NaiveDate,
    time: Option<NaiveTime>,
    offset: Option<ExplicitOffset>,
    /// The date text with the consumed date blanked out, searched for times
    remainder: String,
}

/// Stateless orchestrator over the detector, extractor and resolver.
///
/// Holds only a shared reference to a read-only [`TimezoneTable`], so one
/// instance can be used from any number of threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    table: &'a TimezoneTable,
    year_window: i32,
}

impl Default for Normalizer<'static> {
    fn default() -> Self {
        Normalizer::new(&TIMEZONES)
    }
}

impl<'a> Normalizer<'a> {
    pub fn new(table: &'a TimezoneTable) -> Self {
        Self {
            table,
            year_window: DEFAULT_YEAR_WINDOW,
        }
    }

    /// Accept years at most `window` years away from the reference year
    pub fn with_year_window(mut self, window: i32) -> Self {
        self.year_window = window;
        self
    }

    pub fn normalize(&self, input: &RawTemporalInput) -> Result<NormalizedInstant> {
        let date_text = clean(&input.date_text);
        if date_text.is_empty() {
            return Err(ParseError::EmptyInput);
        }
        let time_text = input
            .time_text
            .as_deref()
            .map(clean)
            .filter(|t| !t.is_empty());

        let mut confidence = Confidence::Exact;
        let calendar = self.calendar_date(&date_text, input.reference_year, &mut confidence)?;

        let times = self.time_of_day(&calendar, time_text.as_deref())?;
        let (start_time, end_time) = match &times {
            Some(range) => (range.start, range.end),
            None => {
                confidence = confidence.downgrade(Confidence::DateOnly);
                (NaiveTime::MIN, None)
            }
        };

        let zone_text = match &time_text {
            Some(t) => format!("{date_text} {t}"),
            None => date_text.clone(),
        };
        let hint = input.timezone_hint.as_deref();

        let local_start = calendar.date.and_time(start_time);
        let zone = match timezone::resolve(self.table, calendar.offset.as_ref(), &zone_text, hint, local_start) {
            Ok(zone) => zone,
            // A bare date has no clock time to misplace, so it lands on the
            // same day in the target offset
            Err(ParseError::AmbiguousTimezone { token: None }) if times.is_none() && hint.is_none() => {
                ResolvedOffset {
                    offset: target_offset(),
                    label: TARGET_LABEL.to_string(),
                    source: OffsetSource::Target,
                }
            }
            Err(e) => return Err(e),
        };
        if matches!(zone.source, OffsetSource::Hint | OffsetSource::Target) {
            confidence = confidence.downgrade(Confidence::InferredTimezone);
        }
        let start = to_target(zone.offset, local_start)?;

        // End times share the start's calendar date; overnight ranges are not rolled forward
        let end = match end_time {
            Some(end_time) => {
                let local_end = calendar.date.and_time(end_time);
                let end_zone =
                    timezone::resolve(self.table, calendar.offset.as_ref(), &zone_text, hint, local_end)?;
                let end = to_target(end_zone.offset, local_end)?;
                if end < start {
                    return Err(ParseError::InvalidRange {
                        start: start.to_rfc3339(),
                        end: end.to_rfc3339(),
                    });
                }
                Some(end)
            }
            None => None,
        };

        debug!(
            date_text = %input.date_text,
            start = %start,
            end = ?end,
            zone = %zone.label,
            confidence = %confidence,
            "normalized"
        );

        Ok(NormalizedInstant {
            start,
            end,
            source_timezone: zone.label,
            confidence,
        })
    }

    fn calendar_date(
        &self,
        date_text: &str,
        reference_year: i32,
        confidence: &mut Confidence,
    ) -> Result<CalendarDate> {
        if let Some(detected) = detector::detect(date_text) {
            let year = match detected.year {
                Some(year) => year,
                None => {
                    *confidence = confidence.downgrade(Confidence::InferredYear);
                    reference_year
                }
            };
            self.check_year(year, reference_year)?;

            let date = NaiveDate::from_ymd_opt(year, detected.month, detected.day).ok_or_else(|| {
                ParseError::UnrecognizedFormat {
                    text: detected.matched.clone(),
                }
            })?;
            if let Some(named) = detected.weekday {
                if named != date.weekday() {
                    warn!(
                        text = %detected.matched,
                        named = ?named,
                        actual = ?date.weekday(),
                        "weekday does not match date; trusting the date"
                    );
                }
            }

            let mut remainder = date_text.to_string();
            remainder.replace_range(detected.span.clone(), &" ".repeat(detected.span.len()));

            debug!(shape = detected.shape.as_str(), matched = %detected.matched, "detected date shape");
            return Ok(CalendarDate {
                date,
                time: detected.time,
                offset: detected.offset,
                remainder,
            });
        }

        match fallback::parse_generic(date_text) {
            Some(parsed) => {
                self.check_year(parsed.date.year(), reference_year)?;
                Ok(CalendarDate {
                    date: parsed.date,
                    time: parsed.time,
                    offset: parsed.offset,
                    remainder: date_text.to_string(),
                })
            }
            None => Err(ParseError::UnrecognizedFormat {
                text: date_text.to_string(),
            }),
        }
    }

    fn check_year(&self, year: i32, reference_year: i32) -> Result<()> {
        let four_digit = (1000..=9999).contains(&year);
        let window = u32::try_from(self.year_window).unwrap_or(0);
        if !four_digit || year.abs_diff(reference_year) > window {
            return Err(ParseError::YearOutOfBounds { year });
        }
        Ok(())
    }

    /// Separate time text wins, then a time carried by the date shape, then
    /// whatever clock time is left in the date text.
    fn time_of_day(&self, calendar: &CalendarDate, time_text: Option<&str>) -> Result<Option<TimeRange>> {
        if let Some(text) = time_text {
            if let Some(range) = time_range::extract_time_range(text)? {
                return Ok(Some(range));
            }
        }
        if let Some(time) = calendar.time {
            return Ok(Some(TimeRange {
                start: time,
                end: None,
                meridiem: time_range::MeridiemSource::TwentyFourHour,
                matched: time.to_string(),
            }));
        }
        time_range::extract_time_range(&calendar.remainder)
    }
}

fn to_target(offset: FixedOffset, local: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&target_offset()))
        .ok_or_else(|| ParseError::UnrecognizedFormat {
            text: local.to_string(),
        })
}

/// Collapse whitespace and fold dash and space variants to ASCII
fn clean(text: &str) -> String {
    text.replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize one listing's date/time fragments with the shared table.
pub fn normalize(
    date_text: &str,
    time_text: Option<&str>,
    timezone_hint: Option<&str>,
    reference_year: i32,
) -> Result<NormalizedInstant> {
    let input = RawTemporalInput {
        date_text: date_text.to_string(),
        time_text: time_text.map(str::to_string),
        timezone_hint: timezone_hint.map(str::to_string),
        reference_year,
    };
    Normalizer::default().normalize(&input)
}
