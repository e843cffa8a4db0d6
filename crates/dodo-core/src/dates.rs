//! Calendar helpers shared by the habit engine and the task filters.
//!
//! All calendar days are UTC `NaiveDate`s. Weekdays use the Sunday-first
//! numbering (0 = Sunday .. 6 = Saturday) that the API exposes.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Utc};

use crate::error::ValidationError;

/// The current calendar day in UTC.
pub fn today_utc(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Parse an ISO `YYYY-MM-DD` date, tolerating surrounding whitespace.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate)
}

/// Parse an RFC 3339 timestamp. A trailing `Z` and a missing offset are both
/// accepted; a missing offset is read as UTC.
pub fn parse_datetime(value: &str, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = value.trim();
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::InvalidDateTime { field })
}

/// Sunday-first weekday index (0 = Sunday .. 6 = Saturday).
pub fn weekday_sun_first(day: NaiveDate) -> u8 {
    // num_days_from_sunday is always in 0..=6
    day.weekday().num_days_from_sunday() as u8
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// `day + n` days, saturating at the calendar bounds.
pub fn add_days(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_add_days(Days::new(n)).unwrap_or(NaiveDate::MAX)
}

/// Inclusive ascending range of calendar days.
#[derive(Debug, Clone)]
pub struct DayRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DayRange {
    pub fn inclusive(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }
}

impl Iterator for DayRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date(" 2024-03-01 ").unwrap(), d(2024, 3, 1));
        assert_eq!(parse_date("2024-02-30"), Err(ValidationError::InvalidDate));
        assert_eq!(parse_date("yesterday"), Err(ValidationError::InvalidDate));
    }

    #[test]
    fn parses_datetimes_with_and_without_offset() {
        let z = parse_datetime("2024-03-01T10:00:00Z", "deadline").unwrap();
        let offset = parse_datetime("2024-03-01T12:00:00+02:00", "deadline").unwrap();
        let naive = parse_datetime("2024-03-01T10:00:00", "deadline").unwrap();
        assert_eq!(z, offset);
        assert_eq!(z, naive);
        assert_eq!(
            parse_datetime("soon", "deadline"),
            Err(ValidationError::InvalidDateTime { field: "deadline" })
        );
    }

    #[test]
    fn weekday_is_sunday_first() {
        // 2024-03-03 is a Sunday
        assert_eq!(weekday_sun_first(d(2024, 3, 3)), 0);
        assert_eq!(weekday_sun_first(d(2024, 3, 4)), 1);
        assert_eq!(weekday_sun_first(d(2024, 3, 9)), 6);
    }

    #[test]
    fn day_range_is_inclusive() {
        let days: Vec<_> = DayRange::inclusive(d(2024, 2, 28), d(2024, 3, 1)).collect();
        assert_eq!(days, vec![d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1)]);
        assert_eq!(DayRange::inclusive(d(2024, 3, 2), d(2024, 3, 1)).count(), 0);
    }
}
