use crate::calendar::{
    add_days, due_datetime_for, format_date, local_now, local_offset, parse_date,
    parse_time_of_day,
};
use crate::due::{TaskView, days_overdue, is_overdue};
use crate::error::AppError;
use crate::model::{CompletionEntry, DEFAULT_GRACE_PERIOD_MINUTES, RecurrenceKind, Task};
use crate::notify::{Notifier, Reminder, notifier_from_env};
use crate::recurrence::{SchedulePattern, compute_next_due};
use crate::storage::json_store;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub recurrence_type: String,
    pub interval_days: Option<i64>,
    pub interval_exclude_weekends: bool,
    pub schedule_pattern: Option<String>,
    pub has_specific_time: bool,
    pub time_of_day: Option<String>,
    pub grace_period_minutes: Option<u32>,
    pub next_due_date: Option<String>,
}

/// Fields to change on an existing task. `None` leaves a field as it is;
/// `time_of_day: Some(None)` and `next_due_date: Some(None)` clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub recurrence_type: Option<String>,
    pub interval_days: Option<i64>,
    pub interval_exclude_weekends: Option<bool>,
    pub schedule_pattern: Option<String>,
    pub time_of_day: Option<Option<String>>,
    pub grace_period_minutes: Option<u32>,
    pub next_due_date: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Postpone {
    To(Date),
    ByDays(i64),
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub tasks: Vec<TaskView>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub task_id: String,
    pub error: AppError,
}

pub fn create_task(new_task: &NewTask) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    create_task_with_path(&path, new_task, local_now())
}

pub fn get_task(id: &str) -> Result<TaskView, AppError> {
    let path = json_store::store_path()?;
    get_task_with_path(&path, id, local_now())
}

pub fn list_tasks() -> Result<Vec<TaskView>, AppError> {
    let path = json_store::store_path()?;
    list_tasks_with_path(&path, local_now())
}

pub fn update_task(id: &str, update: &TaskUpdate) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    update_task_with_path(&path, id, update)
}

pub fn delete_task(id: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    delete_task_with_path(&path, id)
}

pub fn complete_task(id: &str, notes: Option<&str>) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    complete_task_with_path(&path, id, notes, local_now())
}

pub fn skip_task(id: &str, notes: Option<&str>) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    skip_task_with_path(&path, id, notes, local_now())
}

pub fn postpone_task(id: &str, postpone: Postpone) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    postpone_task_with_path(&path, id, postpone, local_now().date())
}

/// Next due date the task would get if advanced from `from` (today when
/// omitted). Nothing is written.
pub fn preview_next_due(id: &str, from: Option<&str>) -> Result<Option<String>, AppError> {
    let path = json_store::store_path()?;
    let from = match from {
        Some(value) => parse_user_date(value, "from")?,
        None => local_now().date(),
    };
    preview_next_due_with_path(&path, id, from)
}

pub fn notify_overdue() -> Result<NotificationOutcome, AppError> {
    let path = json_store::store_path()?;
    let notifier = notifier_from_env()?;
    notify_overdue_with_path(&path, notifier.as_ref(), local_now())
}

/// Task fields after validation, ready to be written onto a [`Task`].
struct TaskFields {
    title: String,
    kind: RecurrenceKind,
    interval_days: Option<i64>,
    interval_exclude_weekends: bool,
    schedule_pattern: Option<String>,
    has_specific_time: bool,
    time_of_day: Option<String>,
    grace_period_minutes: u32,
    next_due_date: Option<Date>,
}

impl TaskFields {
    /// Fields that do not belong to the task's kind are dropped.
    fn validate(input: &NewTask) -> Result<Self, AppError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }

        let kind = RecurrenceKind::parse(input.recurrence_type.trim()).ok_or_else(|| {
            let names: Vec<&str> = RecurrenceKind::ALL.iter().map(|kind| kind.as_str()).collect();
            AppError::invalid_input(format!(
                "recurrence_type must be one of {}",
                names.join(", ")
            ))
        })?;

        let next_due_date = match input.next_due_date.as_deref() {
            Some(value) => Some(parse_user_date(value, "next_due_date")?),
            None if kind.is_undated() => None,
            None => return Err(AppError::invalid_input("next_due_date is required")),
        };

        let interval_days = if kind == RecurrenceKind::Interval {
            match input.interval_days {
                Some(days) if days > 0 && u32::try_from(days).is_ok() => Some(days),
                _ => {
                    return Err(AppError::invalid_input(
                        "interval_days must be a positive number of days",
                    ));
                }
            }
        } else {
            None
        };

        let schedule_pattern = if kind == RecurrenceKind::Schedule {
            let raw = input
                .schedule_pattern
                .as_deref()
                .ok_or_else(|| AppError::invalid_input("schedule_pattern is required"))?;
            let pattern =
                SchedulePattern::parse(raw).map_err(|err| AppError::invalid_input(err.message()))?;
            Some(pattern.to_json()?)
        } else {
            None
        };

        let time_of_day = match (input.has_specific_time, input.time_of_day.as_deref()) {
            (true, Some(value)) => {
                parse_time_of_day(value)
                    .map_err(|_| AppError::invalid_input("time_of_day must be HH:MM"))?;
                Some(value.trim().to_string())
            }
            (true, None) => return Err(AppError::invalid_input("time_of_day is required")),
            (false, Some(_)) => {
                return Err(AppError::invalid_input(
                    "time_of_day requires has_specific_time",
                ));
            }
            (false, None) => None,
        };

        Ok(Self {
            title: title.to_string(),
            kind,
            interval_exclude_weekends: interval_days.is_some() && input.interval_exclude_weekends,
            interval_days,
            schedule_pattern,
            has_specific_time: input.has_specific_time,
            time_of_day,
            grace_period_minutes: input
                .grace_period_minutes
                .unwrap_or(DEFAULT_GRACE_PERIOD_MINUTES),
            next_due_date,
        })
    }

    /// Writes the fields onto `task`, re-deriving `next_due_datetime`.
    fn apply_to(self, task: &mut Task) -> Result<(), AppError> {
        task.title = self.title;
        task.recurrence_type = self.kind.as_str().to_string();
        task.interval_days = self.interval_days;
        task.interval_exclude_weekends = self.interval_exclude_weekends;
        task.schedule_pattern = self.schedule_pattern;
        task.has_specific_time = self.has_specific_time;
        task.time_of_day = self.time_of_day;
        task.grace_period_minutes = self.grace_period_minutes;
        apply_next_due(task, self.next_due_date)
    }
}

impl NewTask {
    /// The creation input that would reproduce `task`'s current fields.
    fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            recurrence_type: task.recurrence_type.clone(),
            interval_days: task.interval_days,
            interval_exclude_weekends: task.interval_exclude_weekends,
            schedule_pattern: task.schedule_pattern.clone(),
            has_specific_time: task.has_specific_time,
            time_of_day: task.time_of_day.clone(),
            grace_period_minutes: Some(task.grace_period_minutes),
            next_due_date: task.next_due_date.clone(),
        }
    }

    fn merge(mut self, update: &TaskUpdate) -> Self {
        if let Some(title) = update.title.as_ref() {
            self.title = title.clone();
        }
        if let Some(recurrence_type) = update.recurrence_type.as_ref() {
            self.recurrence_type = recurrence_type.clone();
        }
        if let Some(days) = update.interval_days {
            self.interval_days = Some(days);
        }
        if let Some(exclude) = update.interval_exclude_weekends {
            self.interval_exclude_weekends = exclude;
        }
        if let Some(pattern) = update.schedule_pattern.as_ref() {
            self.schedule_pattern = Some(pattern.clone());
        }
        if let Some(time_of_day) = update.time_of_day.as_ref() {
            self.has_specific_time = time_of_day.is_some();
            self.time_of_day = time_of_day.clone();
        }
        if let Some(minutes) = update.grace_period_minutes {
            self.grace_period_minutes = Some(minutes);
        }
        if let Some(next_due_date) = update.next_due_date.as_ref() {
            self.next_due_date = next_due_date.clone();
        }
        self
    }
}

fn create_task_with_path(
    path: &Path,
    new_task: &NewTask,
    now: PrimitiveDateTime,
) -> Result<Task, AppError> {
    let fields = TaskFields::validate(new_task)?;

    let mut task = Task {
        id: format!("task-{}", OffsetDateTime::now_utc().unix_timestamp_nanos()),
        title: String::new(),
        created_at: timestamp(now)?,
        recurrence_type: String::new(),
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
    };
    fields.apply_to(&mut task)?;

    let mut tasks = json_store::load_tasks(path)?;
    tasks.push(task.clone());
    json_store::save_tasks(path, &tasks)?;

    tracing::debug!(task_id = %task.id, recurrence_type = %task.recurrence_type, "task created");
    Ok(task)
}

fn update_task_with_path(path: &Path, id: &str, update: &TaskUpdate) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    if update.is_empty() {
        return Err(AppError::invalid_input("no fields to update"));
    }

    let mut tasks = json_store::load_tasks(path)?;
    let task = find_task_mut(&mut tasks, trimmed_id)?;

    let fields = TaskFields::validate(&NewTask::from_task(task).merge(update))?;
    fields.apply_to(task)?;

    let updated = task.clone();
    json_store::save_tasks(path, &tasks)?;

    tracing::debug!(task_id = %updated.id, next_due_date = ?updated.next_due_date, "task updated");
    Ok(updated)
}

fn get_task_with_path(path: &Path, id: &str, now: PrimitiveDateTime) -> Result<TaskView, AppError> {
    let trimmed_id = required_id(id)?;
    let task = json_store::load_tasks(path)?
        .into_iter()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;
    TaskView::at(task, now)
}

fn list_tasks_with_path(path: &Path, now: PrimitiveDateTime) -> Result<Vec<TaskView>, AppError> {
    let mut views = json_store::load_tasks(path)?
        .into_iter()
        .map(|task| TaskView::at(task, now))
        .collect::<Result<Vec<_>, _>>()?;

    views.sort_by(|a, b| {
        let left = a.task.next_due_date.as_deref();
        let right = b.task.next_due_date.as_deref();
        left.is_none()
            .cmp(&right.is_none())
            .then_with(|| left.cmp(&right))
            .then_with(|| a.task.created_at.cmp(&b.task.created_at))
    });

    Ok(views)
}

fn delete_task_with_path(path: &Path, id: &str) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    let mut tasks = json_store::load_tasks(path)?;
    let index = tasks
        .iter()
        .position(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;

    let removed = tasks.remove(index);
    json_store::save_tasks(path, &tasks)?;

    tracing::debug!(task_id = %removed.id, "task deleted");
    Ok(removed)
}

fn complete_task_with_path(
    path: &Path,
    id: &str,
    notes: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    let mut tasks = json_store::load_tasks(path)?;
    let task = find_task_mut(&mut tasks, trimmed_id)?;

    let was_overdue = is_overdue(task, now)?;
    let days_overdue = days_overdue(task, now)?;
    let next_due = next_due_for(task, now.date())?;
    let completed_at = timestamp(now)?;

    task.completion_history.push(CompletionEntry {
        completed_at: completed_at.clone(),
        was_overdue,
        days_overdue,
        skipped: false,
        notes: normalize_notes(notes),
    });
    task.last_completed_at = Some(completed_at);
    apply_next_due(task, next_due)?;

    let updated = task.clone();
    json_store::save_tasks(path, &tasks)?;

    tracing::debug!(
        task_id = %updated.id,
        was_overdue,
        days_overdue,
        next_due_date = ?updated.next_due_date,
        "task completed"
    );
    Ok(updated)
}

fn skip_task_with_path(
    path: &Path,
    id: &str,
    notes: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    let mut tasks = json_store::load_tasks(path)?;
    let task = find_task_mut(&mut tasks, trimmed_id)?;

    let next_due = next_due_for(task, now.date())?;
    task.completion_history.push(CompletionEntry {
        completed_at: timestamp(now)?,
        was_overdue: false,
        days_overdue: 0,
        skipped: true,
        notes: normalize_notes(notes),
    });
    apply_next_due(task, next_due)?;

    let updated = task.clone();
    json_store::save_tasks(path, &tasks)?;

    tracing::debug!(task_id = %updated.id, next_due_date = ?updated.next_due_date, "task skipped");
    Ok(updated)
}

fn postpone_task_with_path(
    path: &Path,
    id: &str,
    postpone: Postpone,
    today: Date,
) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    let mut tasks = json_store::load_tasks(path)?;
    let task = find_task_mut(&mut tasks, trimmed_id)?;

    let kind = task.kind().ok_or_else(|| {
        AppError::recurrence(format!(
            "unknown recurrence type: {}",
            task.recurrence_type
        ))
    })?;
    if kind.is_undated() {
        return Err(AppError::invalid_input(
            "cannot postpone tasks without dates",
        ));
    }

    let new_due = match postpone {
        Postpone::To(date) => date,
        Postpone::ByDays(0) => return Err(AppError::invalid_input("days must not be zero")),
        Postpone::ByDays(days) => {
            let base = match task.next_due_date.as_deref() {
                Some(value) => parse_date(value)?,
                None => today,
            };
            add_days(base, days)
                .map_err(|_| AppError::invalid_input("postponed date is out of range"))?
        }
    };
    apply_next_due(task, Some(new_due))?;

    let updated = task.clone();
    json_store::save_tasks(path, &tasks)?;

    tracing::debug!(task_id = %updated.id, next_due_date = ?updated.next_due_date, "task postponed");
    Ok(updated)
}

fn preview_next_due_with_path(path: &Path, id: &str, from: Date) -> Result<Option<String>, AppError> {
    let trimmed_id = required_id(id)?;
    let tasks = json_store::load_tasks(path)?;
    let task = tasks
        .iter()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;

    next_due_for(task, from)?.map(format_date).transpose()
}

fn notify_overdue_with_path(
    path: &Path,
    notifier: &dyn Notifier,
    now: PrimitiveDateTime,
) -> Result<NotificationOutcome, AppError> {
    let tasks = json_store::load_tasks(path)?;
    let mut notified = Vec::new();
    let mut failures = Vec::new();

    for task in tasks {
        if task.kind() == Some(RecurrenceKind::Inactive) {
            continue;
        }

        let view = TaskView::at(task, now)?;
        if !view.is_overdue {
            continue;
        }

        match notifier.notify(&Reminder::for_view(&view)) {
            Ok(()) => notified.push(view),
            Err(error) => {
                tracing::warn!(task_id = %view.task.id, %error, "reminder delivery failed");
                failures.push(NotificationFailure {
                    task_id: view.task.id.clone(),
                    error,
                });
            }
        }
    }

    Ok(NotificationOutcome {
        tasks: notified,
        failures,
    })
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

fn find_task_mut<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task, AppError> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or_else(|| AppError::invalid_input("task not found"))
}

fn next_due_for(task: &Task, from: Date) -> Result<Option<Date>, AppError> {
    compute_next_due(task, from).inspect_err(|err| {
        tracing::warn!(task_id = %task.id, error = %err, "stored recurrence is malformed");
    })
}

/// Writes `next_due_date` and re-derives `next_due_datetime` from it.
fn apply_next_due(task: &mut Task, next_due: Option<Date>) -> Result<(), AppError> {
    task.next_due_date = next_due.map(format_date).transpose()?;
    task.next_due_datetime = match (next_due, task.has_specific_time, task.time_of_day.as_deref()) {
        (Some(date), true, Some(time_of_day)) => Some(due_datetime_for(date, time_of_day)?),
        _ => None,
    };
    Ok(())
}

fn parse_user_date(value: &str, field: &str) -> Result<Date, AppError> {
    parse_date(value).map_err(|_| AppError::invalid_input(format!("{field} must be YYYY-MM-DD")))
}

fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn timestamp(now: PrimitiveDateTime) -> Result<String, AppError> {
    now.assume_offset(local_offset())
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
