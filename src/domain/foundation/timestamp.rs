//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Adds calendar months, clamping the day to the end of a shorter month
    /// (Jan 31 + 1 month = Feb 29 in a leap year).
    ///
    /// Returns `None` only when the result leaves chrono's representable range.
    pub fn add_calendar_months(&self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    /// Returns the last representable millisecond of this timestamp's UTC day,
    /// i.e. `23:59:59.999`.
    pub fn end_of_day(&self) -> Self {
        let midnight = self.0.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self(midnight + Duration::days(1) - Duration::milliseconds(1))
    }

    /// Whole days from `now` until this timestamp, zero once passed.
    pub fn days_until(&self, now: &Timestamp) -> i64 {
        self.duration_since(now).num_days().max(0)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn add_calendar_months_keeps_day_of_month() {
        let ts = at(2024, 1, 15, 10).add_calendar_months(1).unwrap();
        assert_eq!(ts.as_datetime().month(), 2);
        assert_eq!(ts.as_datetime().day(), 15);
    }

    #[test]
    fn add_calendar_months_clamps_to_shorter_month() {
        let ts = at(2024, 1, 31, 8).add_calendar_months(1).unwrap();
        assert_eq!(ts.as_datetime().day(), 29);

        let ts = at(2023, 1, 31, 8).add_calendar_months(1).unwrap();
        assert_eq!(ts.as_datetime().day(), 28);
    }

    #[test]
    fn add_calendar_months_crosses_year_boundary() {
        let ts = at(2024, 11, 10, 0).add_calendar_months(3).unwrap();
        assert_eq!(ts.as_datetime().year(), 2025);
        assert_eq!(ts.as_datetime().month(), 2);
    }

    #[test]
    fn end_of_day_is_last_millisecond() {
        let end = at(2024, 2, 15, 10).end_of_day();
        let expected = Utc.with_ymd_and_hms(2024, 2, 15, 23, 59, 59).unwrap()
            + Duration::milliseconds(999);
        assert_eq!(end.as_datetime(), &expected);
    }

    #[test]
    fn days_until_is_zero_for_past() {
        let now = at(2024, 3, 1, 0);
        assert_eq!(at(2024, 2, 1, 0).days_until(&now), 0);
        assert_eq!(at(2024, 3, 11, 0).days_until(&now), 10);
    }

    #[test]
    fn timestamp_serializes_transparently() {
        let ts = at(2024, 1, 15, 10);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.starts_with("\"2024-01-15T10:00:00"));
    }

    proptest! {
        #[test]
        fn end_of_day_stays_on_same_date(secs in 0i64..4_000_000_000i64) {
            let ts = Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap());
            let end = ts.end_of_day();
            prop_assert_eq!(end.as_datetime().date_naive(), ts.as_datetime().date_naive());
            prop_assert_eq!(end.as_datetime().hour(), 23);
            prop_assert_eq!(end.as_datetime().minute(), 59);
            prop_assert_eq!(end.as_datetime().second(), 59);
            prop_assert_eq!(end.as_datetime().timestamp_subsec_millis(), 999);
            prop_assert!(end >= ts);
        }

        #[test]
        fn calendar_months_never_move_backwards(secs in 0i64..4_000_000_000i64, months in 1u32..=24) {
            let ts = Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap());
            let later = ts.add_calendar_months(months).unwrap();
            prop_assert!(later.is_after(&ts));
            prop_assert!(later.duration_since(&ts) >= Duration::days(28 * months as i64));
        }
    }
}
