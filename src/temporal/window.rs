use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

use super::target_offset;
use crate::common::error::ConfigError;

/// Inclusive span of instants, both ends in the target offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn at(date: NaiveDate, time: NaiveTime) -> Result<DateTime<FixedOffset>, ConfigError> {
    target_offset()
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| ConfigError::Invalid(format!("cannot place {date} {time} in target offset")))
}

impl DateWindow {
    /// From midnight today (target offset) to the last second of `today + days`
    pub fn rolling(now: DateTime<FixedOffset>, days: i64) -> Result<Self, ConfigError> {
        if days < 0 {
            return Err(ConfigError::Invalid(format!("days_ahead must not be negative, got {days}")));
        }
        let today = now.with_timezone(&target_offset()).date_naive();
        let last = today
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| ConfigError::Invalid(format!("days_ahead {days} overflows the calendar")))?;
        Ok(Self {
            start: at(today, NaiveTime::MIN)?,
            end: at(last, end_of_day())?,
        })
    }

    /// Parse `YYYY-MM-DD` bounds; the end date is included in full
    pub fn fixed(start: &str, end: &str) -> Result<Self, ConfigError> {
        let parse = |text: &str| {
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map_err(|e| ConfigError::Invalid(format!("invalid date '{text}': {e}")))
        };
        let (first, last) = (parse(start)?, parse(end)?);
        if last < first {
            return Err(ConfigError::Invalid(format!(
                "end date {last} is before start date {first}"
            )));
        }
        Ok(Self {
            start: at(first, NaiveTime::MIN)?,
            end: at(last, end_of_day())?,
        })
    }

    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        self.start <= *instant && *instant <= self.end
    }

    pub fn describe(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%B %d, %Y"),
            self.end.format("%B %d, %Y")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pst(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<FixedOffset> {
        target_offset().with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_rolling_window_spans_whole_days() {
        let window = DateWindow::rolling(pst(2026, 1, 10, 15, 42, 0), 14).unwrap();
        assert_eq!(window.start, pst(2026, 1, 10, 0, 0, 0));
        assert_eq!(window.end, pst(2026, 1, 24, 23, 59, 59));
    }

    #[test]
    fn test_rolling_window_uses_target_day() {
        // 02:00 UTC on the 11th is still the 10th at UTC-8
        let utc = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2026, 1, 11, 2, 0, 0).unwrap();
        let window = DateWindow::rolling(utc, 0).unwrap();
        assert_eq!(window.start, pst(2026, 1, 10, 0, 0, 0));
        assert_eq!(window.end, pst(2026, 1, 10, 23, 59, 59));
    }

    #[test]
    fn test_negative_days_rejected() {
        assert!(DateWindow::rolling(pst(2026, 1, 10, 0, 0, 0), -1).is_err());
    }

    #[test]
    fn test_fixed_window_includes_end_date() {
        let window = DateWindow::fixed("2026-01-14", "2026-01-28").unwrap();
        assert!(window.contains(&pst(2026, 1, 14, 0, 0, 0)));
        assert!(window.contains(&pst(2026, 1, 28, 23, 59, 59)));
        assert!(!window.contains(&pst(2026, 1, 29, 0, 0, 0)));
        assert!(!window.contains(&pst(2026, 1, 13, 23, 59, 59)));
    }

    #[test]
    fn test_fixed_window_rejects_bad_input() {
        assert!(matches!(DateWindow::fixed("2026-13-01", "2026-12-01"), Err(ConfigError::Invalid(_))));
        assert!(matches!(DateWindow::fixed("2026-02-01", "2026-01-01"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_describe() {
        let window = DateWindow::fixed("2026-01-14", "2026-01-28").unwrap();
        assert_eq!(window.describe(), "January 14, 2026 to January 28, 2026");
    }
}
