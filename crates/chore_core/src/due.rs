//! Overdue and day-offset predicates used for sorting, display and
//! reminder filtering. `now` is always a local wall-clock instant.

use crate::calendar::{
    calendar_days_between, floor_days, local_midnight, parse_date, parse_due_datetime,
};
use crate::error::AppError;
use crate::model::Task;
use serde::Serialize;
use time::{Duration, PrimitiveDateTime};

pub fn is_overdue(task: &Task, now: PrimitiveDateTime) -> Result<bool, AppError> {
    if task.has_specific_time {
        let Some(raw) = task.next_due_datetime.as_deref() else {
            return Ok(false);
        };
        let grace = Duration::minutes(i64::from(task.grace_period_minutes));
        // A deadline past the representable range is never reached.
        return Ok(parse_due_datetime(raw)?
            .checked_add(grace)
            .is_some_and(|deadline| now > deadline));
    }

    let Some(raw) = task.next_due_date.as_deref() else {
        return Ok(false);
    };
    Ok(parse_date(raw)? < now.date())
}

/// Whole days between the due date's midnight and `now`; zero unless
/// [`is_overdue`] holds.
pub fn days_overdue(task: &Task, now: PrimitiveDateTime) -> Result<i64, AppError> {
    if !is_overdue(task, now)? {
        return Ok(0);
    }

    let Some(raw) = task.next_due_date.as_deref() else {
        return Ok(0);
    };
    let due = local_midnight(parse_date(raw)?);
    Ok(floor_days(now - due).max(0))
}

pub fn days_until_due(task: &Task, now: PrimitiveDateTime) -> Result<Option<i64>, AppError> {
    let Some(raw) = task.next_due_date.as_deref() else {
        return Ok(None);
    };
    let due = parse_date(raw)?;
    Ok(Some(calendar_days_between(now.date(), due)))
}

/// A task together with its due state at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub is_overdue: bool,
    pub days_until_due: Option<i64>,
    pub days_overdue: i64,
}

impl TaskView {
    pub fn at(task: Task, now: PrimitiveDateTime) -> Result<Self, AppError> {
        let is_overdue = is_overdue(&task, now)?;
        let days_until_due = days_until_due(&task, now)?;
        let days_overdue = days_overdue(&task, now)?;
        Ok(Self {
            task,
            is_overdue,
            days_until_due,
            days_overdue,
        })
    }
}
