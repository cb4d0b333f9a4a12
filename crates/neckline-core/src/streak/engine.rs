//! Pure streak calculations over per-day records.

use chrono::NaiveDate;

use super::{StreakRecord, StreakType};
use crate::calendar::days_between;

/// Consecutive completed days ending today or yesterday.
///
/// Walks records newest first with a running cursor that starts at `today`
/// and moves to each counted day. The walk stops at the first record more
/// than one day older than the cursor, or at a not-completed record exactly
/// one day older. A not-completed record for today itself is skipped so the
/// streak still holds before the user has acted.
pub fn current_streak(records: &[StreakRecord], kind: StreakType, today: NaiveDate) -> u32 {
    let mut days: Vec<&StreakRecord> = records
        .iter()
        .filter(|r| r.kind == kind && r.date <= today)
        .collect();
    days.sort_by(|a, b| b.date.cmp(&a.date));

    let mut streak = 0;
    let mut cursor = today;
    for record in days {
        let age = days_between(record.date, cursor);
        if age > 1 {
            break;
        }
        if record.completed {
            streak += 1;
            cursor = record.date;
        } else if age == 1 {
            break;
        }
    }
    streak
}

/// Longest run of consecutive completed days.
///
/// Scans oldest first. The run resets on a not-completed record and on a
/// calendar gap between records, since a missing day had no activity.
pub fn longest_streak(records: &[StreakRecord], kind: StreakType) -> u32 {
    let mut days: Vec<&StreakRecord> = records.iter().filter(|r| r.kind == kind).collect();
    days.sort_by_key(|r| r.date);

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for record in days {
        if previous.is_some_and(|p| days_between(p, record.date) > 1) {
            run = 0;
        }
        if record.completed {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
        previous = Some(record.date);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn record(days_ago: i64, completed: bool) -> StreakRecord {
        StreakRecord {
            id: Uuid::new_v4(),
            date: today() - Duration::days(days_ago),
            completed,
            kind: StreakType::Exercises,
        }
    }

    #[test]
    fn empty_log_has_no_streak() {
        assert_eq!(current_streak(&[], StreakType::Exercises, today()), 0);
        assert_eq!(longest_streak(&[], StreakType::Exercises), 0);
    }

    #[test]
    fn gap_two_days_back_breaks_current_streak() {
        let records = vec![record(0, true), record(1, true), record(3, true)];
        assert_eq!(current_streak(&records, StreakType::Exercises, today()), 2);
    }

    #[test]
    fn yesterday_keeps_streak_alive_before_acting_today() {
        let records = vec![record(1, true), record(2, true)];
        assert_eq!(current_streak(&records, StreakType::Exercises, today()), 2);

        let with_pending_today = vec![record(0, false), record(1, true), record(2, true)];
        assert_eq!(
            current_streak(&with_pending_today, StreakType::Exercises, today()),
            2
        );
    }

    #[test]
    fn missed_yesterday_ends_streak() {
        let records = vec![record(0, true), record(1, false), record(2, true)];
        assert_eq!(current_streak(&records, StreakType::Exercises, today()), 1);
    }

    #[test]
    fn other_types_are_ignored() {
        let mut other = record(0, true);
        other.kind = StreakType::PostureChecks;
        assert_eq!(current_streak(&[other], StreakType::Exercises, today()), 0);
    }

    #[test]
    fn longest_resets_on_missed_day_and_gap() {
        let records = vec![
            record(10, true),
            record(9, true),
            record(8, true),
            record(7, false),
            record(6, true),
            record(4, true),
            record(3, true),
        ];
        assert_eq!(longest_streak(&records, StreakType::Exercises), 3);
    }

    proptest! {
        #[test]
        fn unbroken_run_counts_every_day(n in 1i64..120) {
            let records: Vec<StreakRecord> = (0..n).map(|d| record(d, true)).collect();
            prop_assert_eq!(current_streak(&records, StreakType::Exercises, today()), n as u32);
            prop_assert_eq!(longest_streak(&records, StreakType::Exercises), n as u32);
        }

        #[test]
        fn current_never_exceeds_longest(days in proptest::collection::btree_map(0i64..60, any::<bool>(), 0..40)) {
            let records: Vec<StreakRecord> = days
                .into_iter()
                .map(|(ago, completed)| record(ago, completed))
                .collect();
            let current = current_streak(&records, StreakType::Exercises, today());
            let longest = longest_streak(&records, StreakType::Exercises);
            prop_assert!(current <= longest);
        }
    }
}
