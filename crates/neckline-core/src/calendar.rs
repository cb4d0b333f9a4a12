//! Calendar helpers shared by the scheduler, streaks and leaderboard.
//!
//! Timestamps are stored in UTC. Day and month boundaries are taken in the
//! caller's offset, passed alongside "now" as a `DateTime<FixedOffset>`.
//! chrono only knows the proleptic Gregorian calendar, so month keys never
//! depend on the device's calendar system.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

/// Calendar day of `ts` as seen from `offset`.
pub fn local_day(ts: &DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    ts.with_timezone(offset).date_naive()
}

/// Canonical `YYYY-MM` leaderboard epoch for `now`.
pub fn month_key(now: &DateTime<FixedOffset>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}

/// True when `ts` falls in the same calendar month as `now` and not after it.
pub fn in_current_month(ts: &DateTime<Utc>, now: &DateTime<FixedOffset>) -> bool {
    let local = ts.with_timezone(now.offset());
    local.year() == now.year() && local.month() == now.month() && local <= *now
}

/// Whole days from `earlier` to `later` (negative if reversed).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Format a countdown as `"2h 15m"` or `"15m"`.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bangkok() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn local_day_respects_offset() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 31, 20, 0, 0).unwrap();
        assert_eq!(
            local_day(&ts, &bangkok()),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
    }

    #[test]
    fn month_key_is_zero_padded_gregorian() {
        let now = bangkok().with_ymd_and_hms(2025, 1, 9, 8, 0, 0).unwrap();
        assert_eq!(month_key(&now), "2025-01");
    }

    #[test]
    fn month_rollover_at_midnight_uses_local_month() {
        let now = bangkok().with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
        let late_october = Utc.with_ymd_and_hms(2025, 10, 31, 16, 59, 0).unwrap();
        let first_of_november = Utc.with_ymd_and_hms(2025, 10, 31, 17, 0, 0).unwrap();

        assert_eq!(month_key(&now), "2025-11");
        assert!(!in_current_month(&late_october, &now));
        assert!(in_current_month(&first_of_november, &now));
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(Duration::minutes(135)), "2h 15m");
        assert_eq!(format_countdown(Duration::minutes(15)), "15m");
        assert_eq!(format_countdown(Duration::seconds(-5)), "0m");
    }
}
