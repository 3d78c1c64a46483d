//! Time as an injected dependency.
//!
//! "Today" drives business rules (same-day completion, the today view), so
//! time is abstracted behind a trait and converted to the salon's wall
//! clock explicitly.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Projects an instant onto the salon's local calendar day.
///
/// The salon's zone is carried as a fixed offset east of UTC in minutes.
#[must_use]
pub fn local_date(at: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (at + Duration::minutes(i64::from(utc_offset_minutes))).date_naive()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offset_shifts_the_calendar_day() {
        let late_evening = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        assert_eq!(
            local_date(late_evening, 0),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert_eq!(
            local_date(late_evening, 60),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
        assert_eq!(
            local_date(late_evening, -120),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
    }
}
