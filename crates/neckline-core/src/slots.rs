//! Time-slot availability.
//!
//! Two recurring slots gate when an exercise may be started:
//!
//! - **Quick**: window 00:00-23:59, real gating comes from the post-completion
//!   cooldown.
//! - **Full**: window 06:00-23:59, once per day.
//!
//! Hours before the configured day start (06:00 by default) have no current
//! slot at all. Callers must treat "no current slot" as distinct from "every
//! slot completed".
//!
//! Everything here is a pure function of the completion log and the clock.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::activity::ExerciseCompletion;
use crate::calendar::{format_countdown, local_day};
use crate::storage::ScheduleConfig;

/// A named recurring activity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Quick,
    Full,
}

impl TimeSlot {
    /// Fixed scan order used by [`SlotScheduler::next_available_slot`].
    pub const ALL: [TimeSlot; 2] = [TimeSlot::Quick, TimeSlot::Full];

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::Quick => "Quick",
            TimeSlot::Full => "Full",
        }
    }

    /// Slots that close for the rest of the day after one completion.
    pub fn once_per_day(&self) -> bool {
        matches!(self, TimeSlot::Full)
    }
}

impl std::str::FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(TimeSlot::Quick),
            "full" => Ok(TimeSlot::Full),
            other => Err(format!("unknown slot '{other}' (expected quick or full)")),
        }
    }
}

/// Inclusive hour range `[start_hour, end_hour]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SlotWindow {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour <= self.end_hour
    }
}

/// Result of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCheck {
    pub can_start: bool,
    /// Time left in the cooldown, set only when `can_start` is false.
    pub remaining: Option<Duration>,
}

impl StartCheck {
    fn ready() -> Self {
        Self {
            can_start: true,
            remaining: None,
        }
    }
}

/// Per-slot availability report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot: TimeSlot,
    pub window: SlotWindow,
    pub active: bool,
    pub completed_today: bool,
    pub can_start: bool,
    pub cooldown_remaining_secs: Option<i64>,
    pub cooldown_countdown: Option<String>,
    pub has_passed: bool,
}

/// Slot availability calculator.
#[derive(Debug, Clone)]
pub struct SlotScheduler {
    quick: SlotWindow,
    full: SlotWindow,
    day_start_hour: u32,
    cooldown_minutes: u32,
}

impl Default for SlotScheduler {
    fn default() -> Self {
        Self::new(&ScheduleConfig::default())
    }
}

impl SlotScheduler {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            quick: SlotWindow {
                start_hour: config.quick_start_hour,
                end_hour: config.quick_end_hour,
            },
            full: SlotWindow {
                start_hour: config.full_start_hour,
                end_hour: config.full_end_hour,
            },
            day_start_hour: config.day_start_hour,
            cooldown_minutes: config.cooldown_minutes,
        }
    }

    pub fn window(&self, slot: TimeSlot) -> SlotWindow {
        match slot {
            TimeSlot::Quick => self.quick,
            TimeSlot::Full => self.full,
        }
    }

    /// Configured cooldown in minutes.
    pub fn cooldown_minutes(&self) -> u32 {
        self.cooldown_minutes
    }

    /// True iff the hour of `at` falls inside the slot's window.
    pub fn is_active(&self, slot: TimeSlot, at: &DateTime<FixedOffset>) -> bool {
        self.window(slot).contains(at.hour())
    }

    /// First slot active at `at`, or `None` inside the pre-dawn dead zone.
    pub fn current_slot(&self, at: &DateTime<FixedOffset>) -> Option<TimeSlot> {
        if at.hour() < self.day_start_hour {
            return None;
        }
        TimeSlot::ALL
            .into_iter()
            .find(|slot| self.is_active(*slot, at))
    }

    /// Most recent completion of `slot` on the calendar day of `at`.
    pub fn last_completion(
        &self,
        completions: &[ExerciseCompletion],
        slot: TimeSlot,
        at: &DateTime<FixedOffset>,
    ) -> Option<DateTime<Utc>> {
        let today = at.date_naive();
        completions
            .iter()
            .filter(|c| c.time_slot == slot && local_day(&c.completed_at, at.offset()) == today)
            .map(|c| c.completed_at)
            .max()
    }

    /// Cooldown gate for starting `slot` at `at`.
    pub fn can_start(
        &self,
        completions: &[ExerciseCompletion],
        slot: TimeSlot,
        at: &DateTime<FixedOffset>,
        cooldown_minutes: u32,
    ) -> StartCheck {
        let Some(last) = self.last_completion(completions, slot, at) else {
            tracing::debug!(slot = slot.label(), "no completion today, can start");
            return StartCheck::ready();
        };

        let cooldown = Duration::minutes(i64::from(cooldown_minutes));
        let elapsed = at.with_timezone(&Utc) - last;
        if elapsed >= cooldown {
            StartCheck::ready()
        } else {
            let remaining = cooldown - elapsed;
            tracing::debug!(
                slot = slot.label(),
                remaining_secs = remaining.num_seconds(),
                "slot cooling down"
            );
            StartCheck {
                can_start: false,
                remaining: Some(remaining),
            }
        }
    }

    /// True when `slot` is once-per-day and already completed on the day of `at`.
    pub fn done_for_today(
        &self,
        completions: &[ExerciseCompletion],
        slot: TimeSlot,
        at: &DateTime<FixedOffset>,
    ) -> bool {
        slot.once_per_day() && self.last_completion(completions, slot, at).is_some()
    }

    /// Slots with at least one completion on the day of `at`.
    pub fn completed_slots(
        &self,
        completions: &[ExerciseCompletion],
        at: &DateTime<FixedOffset>,
    ) -> BTreeSet<TimeSlot> {
        let today = at.date_naive();
        completions
            .iter()
            .filter(|c| local_day(&c.completed_at, at.offset()) == today)
            .map(|c| c.time_slot)
            .collect()
    }

    /// First slot not completed today, and when its window opens.
    ///
    /// Falls back to tomorrow's Quick start when every slot is done or the
    /// first open slot's window has already closed.
    pub fn next_available_slot(
        &self,
        completions: &[ExerciseCompletion],
        at: &DateTime<FixedOffset>,
    ) -> (TimeSlot, DateTime<FixedOffset>) {
        let completed = self.completed_slots(completions, at);
        let today = at.date_naive();

        if let Some(slot) = TimeSlot::ALL.into_iter().find(|s| !completed.contains(s)) {
            let window = self.window(slot);
            if window.contains(at.hour()) {
                return (slot, *at);
            }
            if at.hour() < window.start_hour {
                return (slot, at_hour(today, window.start_hour, at.offset()));
            }
        }

        let tomorrow = today.succ_opt().unwrap_or(today);
        (
            TimeSlot::Quick,
            at_hour(tomorrow, self.quick.start_hour, at.offset()),
        )
    }

    /// True once the clock is past the slot's end boundary (end hour, minute 59).
    pub fn time_slot_has_passed(&self, slot: TimeSlot, at: &DateTime<FixedOffset>) -> bool {
        let end = self.window(slot).end_hour;
        at.hour() > end || (at.hour() == end && at.minute() >= 59)
    }

    /// Availability of every slot at `at` using the configured cooldown.
    pub fn status(
        &self,
        completions: &[ExerciseCompletion],
        at: &DateTime<FixedOffset>,
    ) -> Vec<SlotStatus> {
        let completed = self.completed_slots(completions, at);
        TimeSlot::ALL
            .into_iter()
            .map(|slot| {
                let check = self.can_start(completions, slot, at, self.cooldown_minutes);
                SlotStatus {
                    slot,
                    window: self.window(slot),
                    active: self.is_active(slot, at),
                    completed_today: completed.contains(&slot),
                    can_start: check.can_start && !self.done_for_today(completions, slot, at),
                    cooldown_remaining_secs: check.remaining.map(|d| d.num_seconds()),
                    cooldown_countdown: check.remaining.map(format_countdown),
                    has_passed: self.time_slot_has_passed(slot, at),
                }
            })
            .collect()
    }
}

fn at_hour(day: NaiveDate, hour: u32, offset: &FixedOffset) -> DateTime<FixedOffset> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let local = day.and_time(time);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, *offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        utc().with_ymd_and_hms(2025, 6, day, hour, minute, 0).unwrap()
    }

    fn completion(slot: TimeSlot, when: DateTime<FixedOffset>) -> ExerciseCompletion {
        ExerciseCompletion {
            id: Uuid::new_v4(),
            exercise_id: Uuid::new_v4(),
            completed_at: when.with_timezone(&Utc),
            duration_seconds: 60,
            time_slot: slot,
        }
    }

    #[test]
    fn full_window_is_six_to_twenty_three() {
        let s = SlotScheduler::default();
        assert!(!s.is_active(TimeSlot::Full, &at(10, 5, 59)));
        assert!(s.is_active(TimeSlot::Full, &at(10, 6, 0)));
        assert!(s.is_active(TimeSlot::Full, &at(10, 23, 30)));
        assert!(s.is_active(TimeSlot::Quick, &at(10, 2, 0)));
    }

    #[test]
    fn pre_dawn_has_no_current_slot() {
        let s = SlotScheduler::default();
        assert_eq!(s.current_slot(&at(10, 3, 0)), None);
        assert_eq!(s.current_slot(&at(10, 9, 0)), Some(TimeSlot::Quick));
    }

    #[test]
    fn quick_cooldown_blocks_then_releases() {
        let s = SlotScheduler::default();
        let log = vec![completion(TimeSlot::Quick, at(10, 9, 0))];

        let blocked = s.can_start(&log, TimeSlot::Quick, &at(10, 9, 1), 60);
        assert!(!blocked.can_start);
        assert_eq!(blocked.remaining, Some(Duration::minutes(59)));

        let released = s.can_start(&log, TimeSlot::Quick, &at(10, 10, 1), 60);
        assert!(released.can_start);
        assert_eq!(released.remaining, None);
    }

    #[test]
    fn cooldown_only_considers_same_day_and_slot() {
        let s = SlotScheduler::default();
        let log = vec![
            completion(TimeSlot::Quick, at(9, 23, 50)),
            completion(TimeSlot::Full, at(10, 8, 55)),
        ];
        assert!(s.can_start(&log, TimeSlot::Quick, &at(10, 0, 5), 60).can_start);
        assert!(s.can_start(&log, TimeSlot::Quick, &at(10, 9, 0), 60).can_start);
        assert!(!s.can_start(&log, TimeSlot::Full, &at(10, 9, 0), 60).can_start);
    }

    #[test]
    fn next_slot_is_immediate_inside_window() {
        let s = SlotScheduler::default();
        let now = at(10, 8, 0);
        assert_eq!(s.next_available_slot(&[], &now), (TimeSlot::Quick, now));
    }

    #[test]
    fn next_slot_skips_completed_and_waits_for_window() {
        let s = SlotScheduler::default();
        let log = vec![completion(TimeSlot::Quick, at(10, 1, 0))];
        let (slot, when) = s.next_available_slot(&log, &at(10, 2, 0));
        assert_eq!(slot, TimeSlot::Full);
        assert_eq!(when, at(10, 6, 0));
    }

    #[test]
    fn next_slot_falls_back_to_tomorrow_quick() {
        let s = SlotScheduler::default();
        let log = vec![
            completion(TimeSlot::Quick, at(10, 7, 0)),
            completion(TimeSlot::Full, at(10, 8, 0)),
        ];
        let (slot, when) = s.next_available_slot(&log, &at(10, 20, 0));
        assert_eq!(slot, TimeSlot::Quick);
        assert_eq!(when, at(11, 0, 0));
    }

    #[test]
    fn slot_passes_at_last_minute_of_end_hour() {
        let config = ScheduleConfig {
            full_end_hour: 17,
            ..ScheduleConfig::default()
        };
        let s = SlotScheduler::new(&config);
        assert!(!s.time_slot_has_passed(TimeSlot::Full, &at(10, 17, 58)));
        assert!(s.time_slot_has_passed(TimeSlot::Full, &at(10, 17, 59)));
        assert!(s.time_slot_has_passed(TimeSlot::Full, &at(10, 18, 0)));
    }

    #[test]
    fn status_reports_cooldown_countdown() {
        let s = SlotScheduler::default();
        let log = vec![completion(TimeSlot::Quick, at(10, 9, 0))];
        let status = s.status(&log, &at(10, 9, 30));

        let quick = &status[0];
        assert_eq!(quick.slot, TimeSlot::Quick);
        assert!(quick.completed_today);
        assert!(!quick.can_start);
        assert_eq!(quick.cooldown_countdown.as_deref(), Some("30m"));

        let full = &status[1];
        assert!(full.can_start);
        assert!(!full.completed_today);
    }

    #[test]
    fn full_slot_closes_after_one_completion() {
        let s = SlotScheduler::default();
        let log = vec![completion(TimeSlot::Full, at(10, 8, 0))];

        assert!(s.done_for_today(&log, TimeSlot::Full, &at(10, 20, 0)));
        assert!(!s.done_for_today(&log, TimeSlot::Full, &at(11, 8, 0)));
        assert!(!s.done_for_today(&log, TimeSlot::Quick, &at(10, 20, 0)));

        let full = &s.status(&log, &at(10, 20, 0))[1];
        assert!(full.completed_today);
        assert!(!full.can_start);
        assert_eq!(full.cooldown_remaining_secs, None);
    }

    #[test]
    fn slot_parses_case_insensitively() {
        assert_eq!("Quick".parse::<TimeSlot>(), Ok(TimeSlot::Quick));
        assert_eq!("FULL".parse::<TimeSlot>(), Ok(TimeSlot::Full));
        assert!("evening".parse::<TimeSlot>().is_err());
    }
}
