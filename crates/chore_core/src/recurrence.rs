//! Next-due computation for every recurrence policy.

use crate::calendar::{add_days, today, weekday_number};
use crate::error::AppError;
use crate::model::{RecurrenceKind, Task};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

const WEEKLY_SEARCH_DAYS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulePattern {
    /// Weekday numbers, Sunday = 0.
    Weekly { weekdays: Vec<u8> },
    /// Days of the month, 1 through 31.
    Monthly { days: Vec<u8> },
}

impl SchedulePattern {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let pattern: Self = serde_json::from_str(raw)
            .map_err(|err| AppError::recurrence(format!("unreadable schedule pattern: {err}")))?;
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|err| AppError::invalid_data(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::Weekly { weekdays } => {
                if weekdays.is_empty() {
                    return Err(AppError::recurrence("weekly pattern has no weekdays"));
                }
                if let Some(day) = weekdays.iter().find(|day| **day > 6) {
                    return Err(AppError::recurrence(format!(
                        "weekday {day} is outside 0..=6"
                    )));
                }
            }
            Self::Monthly { days } => {
                if days.is_empty() {
                    return Err(AppError::recurrence("monthly pattern has no days"));
                }
                if let Some(day) = days.iter().find(|day| !(1..=31).contains(*day)) {
                    return Err(AppError::recurrence(format!(
                        "day of month {day} is outside 1..=31"
                    )));
                }
            }
        }
        Ok(())
    }

    /// First matching date strictly after `from`.
    pub fn next_after(&self, from: Date) -> Result<Date, AppError> {
        match self {
            Self::Weekly { weekdays } => next_weekly(weekdays, from),
            Self::Monthly { days } => next_monthly(days, from),
        }
    }
}

/// A task's recurrence policy, interpreted from its stored fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    OneTime,
    NoDate,
    Inactive,
    Interval { days: u32, exclude_weekends: bool },
    Schedule(SchedulePattern),
}

impl Recurrence {
    pub fn from_task(task: &Task) -> Result<Self, AppError> {
        let kind = task.kind().ok_or_else(|| {
            AppError::recurrence(format!(
                "unknown recurrence type: {}",
                task.recurrence_type
            ))
        })?;

        match kind {
            RecurrenceKind::OneTime => Ok(Self::OneTime),
            RecurrenceKind::NoDate => Ok(Self::NoDate),
            RecurrenceKind::Inactive => Ok(Self::Inactive),
            RecurrenceKind::Interval => {
                let days = task
                    .interval_days
                    .ok_or_else(|| AppError::recurrence("interval task has no interval_days"))?;
                let days = u32::try_from(days)
                    .ok()
                    .filter(|days| *days > 0)
                    .ok_or_else(|| {
                        AppError::recurrence(format!("interval_days must be positive: {days}"))
                    })?;
                Ok(Self::Interval {
                    days,
                    exclude_weekends: task.interval_exclude_weekends,
                })
            }
            RecurrenceKind::Schedule => {
                let raw = task
                    .schedule_pattern
                    .as_deref()
                    .ok_or_else(|| AppError::recurrence("schedule task has no schedule_pattern"))?;
                Ok(Self::Schedule(SchedulePattern::parse(raw)?))
            }
        }
    }

    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Self::OneTime => RecurrenceKind::OneTime,
            Self::NoDate => RecurrenceKind::NoDate,
            Self::Inactive => RecurrenceKind::Inactive,
            Self::Interval { .. } => RecurrenceKind::Interval,
            Self::Schedule(_) => RecurrenceKind::Schedule,
        }
    }

    pub fn next_due(&self, from: Date) -> Result<Option<Date>, AppError> {
        match self {
            Self::OneTime | Self::NoDate | Self::Inactive => Ok(None),
            Self::Interval {
                days,
                exclude_weekends,
            } => next_interval(*days, *exclude_weekends, from).map(Some),
            Self::Schedule(pattern) => pattern.next_after(from).map(Some),
        }
    }
}

pub fn compute_next_due(task: &Task, from: Date) -> Result<Option<Date>, AppError> {
    Recurrence::from_task(task)?.next_due(from)
}

pub fn compute_next_due_from_today(task: &Task) -> Result<Option<Date>, AppError> {
    compute_next_due(task, today())
}

fn next_interval(days: u32, exclude_weekends: bool, from: Date) -> Result<Date, AppError> {
    let next = add_days(from, i64::from(days))?;
    if !exclude_weekends {
        return Ok(next);
    }

    match weekday_number(next) {
        0 => add_days(next, 1),
        6 => add_days(next, 2),
        _ => Ok(next),
    }
}

fn next_weekly(weekdays: &[u8], from: Date) -> Result<Date, AppError> {
    let mut current = add_days(from, 1)?;
    for _ in 0..WEEKLY_SEARCH_DAYS {
        if weekdays.contains(&weekday_number(current)) {
            return Ok(current);
        }
        current = add_days(current, 1)?;
    }

    Err(AppError::recurrence("could not find next weekly occurrence"))
}

fn next_monthly(days: &[u8], from: Date) -> Result<Date, AppError> {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if let Some(day) = sorted.iter().copied().find(|day| *day > from.day())
        && let Ok(date) = Date::from_calendar_date(from.year(), from.month(), day)
    {
        return Ok(date);
    }

    let (year, month) = match from.month() {
        Month::December => (from.year() + 1, Month::January),
        other => (from.year(), other.next()),
    };

    sorted
        .iter()
        .find_map(|day| Date::from_calendar_date(year, month, *day).ok())
        .ok_or_else(|| AppError::recurrence("could not find next monthly occurrence"))
}

#[cfg(test)]
mod tests {
    use super::{Recurrence, SchedulePattern, compute_next_due};
    use crate::model::{DEFAULT_GRACE_PERIOD_MINUTES, RecurrenceKind, Task};
    use time::Date;
    use time::macros::date;

    fn task(recurrence_type: &str) -> Task {
        Task {
            id: "task-1".to_string(),
            title: "water plants".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            recurrence_type: recurrence_type.to_string(),
            interval_days: None,
            interval_exclude_weekends: false,
            schedule_pattern: None,
            has_specific_time: false,
            time_of_day: None,
            grace_period_minutes: DEFAULT_GRACE_PERIOD_MINUTES,
            next_due_date: None,
            next_due_datetime: None,
            last_completed_at: None,
            completion_history: Vec::new(),
        }
    }

    fn interval(days: i64, exclude_weekends: bool) -> Task {
        let mut task = task("interval");
        task.interval_days = Some(days);
        task.interval_exclude_weekends = exclude_weekends;
        task
    }

    fn schedule(pattern: &str) -> Task {
        let mut task = task("schedule");
        task.schedule_pattern = Some(pattern.to_string());
        task
    }

    fn next(task: &Task, from: Date) -> Date {
        compute_next_due(task, from).unwrap().expect("next due date")
    }

    #[test]
    fn interval_adds_calendar_days() {
        let starts = [
            date!(2024 - 01 - 05),
            date!(2024 - 02 - 28),
            date!(2023 - 12 - 31),
        ];
        for days in [1, 2, 7, 30, 365] {
            for from in starts {
                let expected = from + time::Duration::days(days);
                assert_eq!(next(&interval(days, false), from), expected);
            }
        }
    }

    #[test]
    fn interval_rolls_saturday_to_monday() {
        // Friday + 1 lands on Saturday.
        let task = interval(1, true);
        assert_eq!(next(&task, date!(2024 - 01 - 05)), date!(2024 - 01 - 08));
    }

    #[test]
    fn interval_rolls_sunday_to_monday() {
        let task = interval(2, true);
        assert_eq!(next(&task, date!(2024 - 01 - 05)), date!(2024 - 01 - 08));
    }

    #[test]
    fn interval_checks_weekday_after_adding() {
        // Starting on a Saturday is fine as long as the result is a weekday.
        let task = interval(2, true);
        assert_eq!(next(&task, date!(2024 - 01 - 06)), date!(2024 - 01 - 08));
        assert_eq!(next(&task, date!(2024 - 01 - 08)), date!(2024 - 01 - 10));
    }

    #[test]
    fn interval_without_exclusion_keeps_weekend() {
        let task = interval(1, false);
        assert_eq!(next(&task, date!(2024 - 01 - 05)), date!(2024 - 01 - 06));
    }

    #[test]
    fn interval_repeated_application_advances_by_interval() {
        let task = interval(3, false);
        let mut current = date!(2024 - 01 - 01);
        for _ in 0..20 {
            let following = next(&task, current);
            assert!(following > current);
            assert_eq!((following - current).whole_days(), 3);
            assert_eq!(next(&task, current), following);
            current = following;
        }
    }

    #[test]
    fn weekly_skips_the_starting_day() {
        // 2024-01-03 is a Wednesday.
        let task = schedule(r#"{"type":"weekly","weekdays":[3,6]}"#);
        assert_eq!(next(&task, date!(2024 - 01 - 03)), date!(2024 - 01 - 06));
    }

    #[test]
    fn weekly_single_day_waits_a_full_week() {
        let task = schedule(r#"{"type":"weekly","weekdays":[3]}"#);
        assert_eq!(next(&task, date!(2024 - 01 - 03)), date!(2024 - 01 - 10));
    }

    #[test]
    fn weekly_crosses_year_boundary() {
        // 2024-12-31 is a Tuesday; Sunday follows on 2025-01-05.
        let task = schedule(r#"{"type":"weekly","weekdays":[0]}"#);
        assert_eq!(next(&task, date!(2024 - 12 - 31)), date!(2025 - 01 - 05));
    }

    #[test]
    fn monthly_picks_next_day_in_current_month() {
        let task = schedule(r#"{"type":"monthly","days":[20,10]}"#);
        assert_eq!(next(&task, date!(2024 - 01 - 05)), date!(2024 - 01 - 10));
        assert_eq!(next(&task, date!(2024 - 01 - 10)), date!(2024 - 01 - 20));
    }

    #[test]
    fn monthly_moves_to_next_month_after_last_day() {
        let task = schedule(r#"{"type":"monthly","days":[1,15]}"#);
        assert_eq!(next(&task, date!(2024 - 01 - 15)), date!(2024 - 02 - 01));
        assert_eq!(next(&task, date!(2024 - 12 - 20)), date!(2025 - 01 - 01));
    }

    #[test]
    fn monthly_day_31_skips_short_february() {
        let task = schedule(r#"{"type":"monthly","days":[31]}"#);
        assert_eq!(next(&task, date!(2024 - 02 - 15)), date!(2024 - 03 - 31));
    }

    #[test]
    fn monthly_day_31_skips_april() {
        let task = schedule(r#"{"type":"monthly","days":[31]}"#);
        assert_eq!(next(&task, date!(2024 - 04 - 15)), date!(2024 - 05 - 31));
    }

    #[test]
    fn monthly_invalid_day_in_current_month_falls_through() {
        // 2023 has no February 29th, and a later valid day is not tried.
        let task = schedule(r#"{"type":"monthly","days":[29]}"#);
        assert_eq!(next(&task, date!(2023 - 02 - 15)), date!(2023 - 03 - 29));
        assert_eq!(next(&task, date!(2024 - 02 - 15)), date!(2024 - 02 - 29));
    }

    #[test]
    fn monthly_takes_first_valid_day_of_next_month() {
        let task = schedule(r#"{"type":"monthly","days":[30,5]}"#);
        assert_eq!(next(&task, date!(2024 - 01 - 30)), date!(2024 - 02 - 05));
    }

    #[test]
    fn monthly_without_valid_day_next_month_fails() {
        let task = schedule(r#"{"type":"monthly","days":[30,31]}"#);
        let err = compute_next_due(&task, date!(2024 - 01 - 31)).unwrap_err();
        assert_eq!(err.code(), "recurrence_error");
    }

    #[test]
    fn non_recurring_kinds_return_none() {
        let starts = [
            date!(2024 - 01 - 05),
            date!(2024 - 02 - 29),
            date!(1999 - 12 - 31),
        ];
        for kind in ["one_time", "no_date", "inactive"] {
            let mut task = task(kind);
            task.interval_days = Some(-4);
            task.schedule_pattern = Some("not json".to_string());
            for from in starts {
                assert_eq!(compute_next_due(&task, from).unwrap(), None);
            }
        }
    }

    #[test]
    fn unknown_recurrence_type_is_recurrence_error() {
        let err = compute_next_due(&task("yearly"), date!(2024 - 01 - 01)).unwrap_err();
        assert_eq!(err.code(), "recurrence_error");
        assert!(err.message().contains("yearly"));
    }

    #[test]
    fn unknown_schedule_pattern_type_is_recurrence_error() {
        let task = schedule(r#"{"type":"yearly","days":[1]}"#);
        let err = compute_next_due(&task, date!(2024 - 01 - 01)).unwrap_err();
        assert_eq!(err.code(), "recurrence_error");
    }

    #[test]
    fn malformed_stored_fields_are_recurrence_errors() {
        let cases = [
            interval(0, false),
            interval(-3, false),
            task("interval"),
            task("schedule"),
            schedule("{"),
            schedule(r#"{"type":"weekly","weekdays":[]}"#),
            schedule(r#"{"type":"weekly","weekdays":[7]}"#),
            schedule(r#"{"type":"monthly","days":[]}"#),
            schedule(r#"{"type":"monthly","days":[0]}"#),
            schedule(r#"{"type":"monthly","days":[32]}"#),
        ];
        for task in cases {
            let err = compute_next_due(&task, date!(2024 - 01 - 01)).unwrap_err();
            assert_eq!(err.code(), "recurrence_error", "{task:?}");
        }
    }

    #[test]
    fn from_task_builds_typed_policy() {
        let policy = Recurrence::from_task(&interval(3, true)).unwrap();
        assert_eq!(
            policy,
            Recurrence::Interval {
                days: 3,
                exclude_weekends: true
            }
        );
        assert_eq!(policy.kind(), RecurrenceKind::Interval);

        let policy = Recurrence::from_task(&schedule(r#"{"type":"weekly","weekdays":[1]}"#))
            .unwrap();
        assert_eq!(
            policy,
            Recurrence::Schedule(SchedulePattern::Weekly { weekdays: vec![1] })
        );
    }

    #[test]
    fn schedule_pattern_serializes_with_type_tag() {
        let pattern = SchedulePattern::Monthly { days: vec![1, 15] };
        assert_eq!(
            pattern.to_json().unwrap(),
            r#"{"type":"monthly","days":[1,15]}"#
        );
    }
}
