//! Current time and date formatting
//!
//! Query timestamps are ISO-8601 with offset at second precision; the
//! descriptions use the short `D/M/YYYY` form.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, Months};

pub type Timestamp = DateTime<FixedOffset>;

/// Source of "now" for relative lookback windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

pub fn format_short_date(ts: &Timestamp) -> String {
    ts.format("%-d/%-m/%Y").to_string()
}

/// `now` minus `days` days, then minus `months` calendar months.
///
/// Month subtraction clamps to the last day of the target month.
pub fn lookback(now: Timestamp, days: u32, months: u32) -> Result<Timestamp> {
    let after_days = Duration::try_days(i64::from(days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or(Error::InvalidNumber)?;
    after_days
        .checked_sub_months(Months::new(months))
        .ok_or(Error::InvalidNumber)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_format_timestamp_keeps_offset() {
        assert_eq!(
            format_timestamp(&ts("2026-06-04T10:11:12.345+03:00")),
            "2026-06-04T10:11:12+03:00"
        );
        assert_eq!(
            format_timestamp(&ts("2026-06-04T10:11:12Z")),
            "2026-06-04T10:11:12+00:00"
        );
    }

    #[test]
    fn test_format_short_date() {
        assert_eq!(format_short_date(&ts("2026-01-05T00:00:00+00:00")), "5/1/2026");
        assert_eq!(format_short_date(&ts("2026-11-25T00:00:00+00:00")), "25/11/2026");
    }

    #[test]
    fn test_lookback_days_then_months() {
        let now = ts("2026-10-19T08:30:00+03:00");
        assert_eq!(
            lookback(now, 15, 4).unwrap(),
            ts("2026-06-04T08:30:00+03:00")
        );
        assert_eq!(lookback(now, 0, 0).unwrap(), now);
    }

    #[test]
    fn test_lookback_clamps_month_end() {
        let now = ts("2026-03-31T12:00:00+00:00");
        assert_eq!(
            lookback(now, 0, 1).unwrap(),
            ts("2026-02-28T12:00:00+00:00")
        );
    }

    #[test]
    fn test_lookback_out_of_range() {
        let now = ts("2026-03-31T12:00:00+00:00");
        assert_eq!(lookback(now, u32::MAX, 0), Err(Error::InvalidNumber));
    }
}
