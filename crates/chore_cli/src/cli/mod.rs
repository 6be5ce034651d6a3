use chore_core::config::ConfigOverrides;
use chore_core::error::AppError;
use chore_core::model::RecurrenceKind;
use chore_core::recurrence::SchedulePattern;
use chore_core::task_api::{NewTask, TaskUpdate};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: chore add "Water plants" --every 3 --due 2024-01-05
    /// Example: chore add "Bins out" --weekly 1,4 --due 2024-01-08 --at 19:00
    /// Example: chore add "Pay rent" --monthly 1 --due 2024-02-01
    Add(AddArgs),
    /// Change fields of an existing task
    ///
    /// Example: chore edit task-1 --due 2024-02-01
    /// Example: chore edit task-1 --at 07:30 --grace 15
    /// Example: chore edit task-1 --monthly 1,15
    Edit(EditArgs),
    /// List tasks ordered by due date
    ///
    /// Example: chore list
    List,
    /// Show details of a task
    ///
    /// Example: chore show task-1
    Show { id: String },
    /// Complete a task and advance it to its next due date
    ///
    /// Example: chore done task-1 -m "also wiped the shelves"
    Done {
        id: String,
        #[arg(short = 'm', long = "message", value_name = "NOTES")]
        message: Option<String>,
    },
    /// Skip the current occurrence and advance to the next due date
    ///
    /// Example: chore skip task-1
    Skip {
        id: String,
        #[arg(short = 'm', long = "message", value_name = "NOTES")]
        message: Option<String>,
    },
    /// Move a task to another date
    ///
    /// Example: chore postpone task-1 --days 2
    /// Example: chore postpone task-1 --to 2024-03-01
    Postpone {
        id: String,
        #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "days", required_unless_present = "days")]
        to: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
    },
    /// Preview the next due date without changing the task
    ///
    /// Example: chore next task-1 --from 2024-02-15
    Next {
        id: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<String>,
    },
    /// Delete a task
    ///
    /// Example: chore delete task-1
    Delete { id: String },
    /// Send reminders for overdue tasks
    ///
    /// Example: chore notify
    Notify,
}

#[derive(Args, Debug, Default)]
pub struct AddArgs {
    pub title: String,
    /// one_time, no_date, interval, schedule or inactive (inferred when omitted)
    #[arg(long = "type", value_name = "TYPE")]
    pub recurrence_type: Option<String>,
    /// First due date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub due: Option<String>,
    /// Repeat every N days after completion
    #[arg(long, value_name = "DAYS")]
    pub every: Option<i64>,
    /// Move interval dates that land on a weekend to Monday
    #[arg(long)]
    pub skip_weekends: bool,
    /// Weekdays to repeat on, Sunday = 0
    #[arg(long, value_name = "WEEKDAYS", value_delimiter = ',', conflicts_with = "monthly")]
    pub weekly: Vec<u8>,
    /// Days of the month to repeat on
    #[arg(long, value_name = "DAYS", value_delimiter = ',')]
    pub monthly: Vec<u8>,
    /// Time of day the task is due
    #[arg(long, value_name = "HH:MM")]
    pub at: Option<String>,
    /// Minutes after the due time before the task counts as overdue
    #[arg(long, value_name = "MINUTES")]
    pub grace: Option<u32>,
}

impl AddArgs {
    pub fn into_new_task(self, default_grace_minutes: u32) -> Result<NewTask, AppError> {
        let schedule_pattern = schedule_pattern_json(self.weekly, self.monthly)?;

        let recurrence_type = match self.recurrence_type {
            Some(value) => value,
            None => infer_kind(self.every, schedule_pattern.is_some(), self.due.is_some())
                .as_str()
                .to_string(),
        };

        Ok(NewTask {
            title: self.title,
            recurrence_type,
            interval_days: self.every,
            interval_exclude_weekends: self.skip_weekends,
            schedule_pattern,
            has_specific_time: self.at.is_some(),
            time_of_day: self.at,
            grace_period_minutes: Some(self.grace.unwrap_or(default_grace_minutes)),
            next_due_date: self.due,
        })
    }
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    /// one_time, no_date, interval, schedule or inactive
    #[arg(long = "type", value_name = "TYPE")]
    pub recurrence_type: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date (undated types only)
    #[arg(long)]
    pub clear_due: bool,
    /// Repeat every N days after completion
    #[arg(long, value_name = "DAYS")]
    pub every: Option<i64>,
    #[arg(long, conflicts_with = "keep_weekends")]
    pub skip_weekends: bool,
    /// Let interval dates land on weekends again
    #[arg(long)]
    pub keep_weekends: bool,
    /// Weekdays to repeat on, Sunday = 0
    #[arg(long, value_name = "WEEKDAYS", value_delimiter = ',', conflicts_with = "monthly")]
    pub weekly: Vec<u8>,
    /// Days of the month to repeat on
    #[arg(long, value_name = "DAYS", value_delimiter = ',')]
    pub monthly: Vec<u8>,
    #[arg(long, value_name = "HH:MM", conflicts_with = "no_time")]
    pub at: Option<String>,
    /// Make the task due at any time on its date
    #[arg(long)]
    pub no_time: bool,
    #[arg(long, value_name = "MINUTES")]
    pub grace: Option<u32>,
}

impl EditArgs {
    pub fn into_update(self) -> Result<TaskUpdate, AppError> {
        let schedule_pattern = schedule_pattern_json(self.weekly, self.monthly)?;

        let recurrence_type = match self.recurrence_type {
            Some(value) => Some(value),
            None if self.every.is_some() => Some(RecurrenceKind::Interval.as_str().to_string()),
            None if schedule_pattern.is_some() => {
                Some(RecurrenceKind::Schedule.as_str().to_string())
            }
            None => None,
        };

        let interval_exclude_weekends = match (self.skip_weekends, self.keep_weekends) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };

        let time_of_day = match (self.at, self.no_time) {
            (Some(value), _) => Some(Some(value)),
            (None, true) => Some(None),
            (None, false) => None,
        };

        let next_due_date = match (self.due, self.clear_due) {
            (Some(value), _) => Some(Some(value)),
            (None, true) => Some(None),
            (None, false) => None,
        };

        Ok(TaskUpdate {
            title: self.title,
            recurrence_type,
            interval_days: self.every,
            interval_exclude_weekends,
            schedule_pattern,
            time_of_day,
            grace_period_minutes: self.grace,
            next_due_date,
        })
    }
}

fn schedule_pattern_json(weekly: Vec<u8>, monthly: Vec<u8>) -> Result<Option<String>, AppError> {
    if !weekly.is_empty() {
        Ok(Some(SchedulePattern::Weekly { weekdays: weekly }.to_json()?))
    } else if !monthly.is_empty() {
        Ok(Some(SchedulePattern::Monthly { days: monthly }.to_json()?))
    } else {
        Ok(None)
    }
}

fn infer_kind(every: Option<i64>, has_pattern: bool, has_due: bool) -> RecurrenceKind {
    if every.is_some() {
        RecurrenceKind::Interval
    } else if has_pattern {
        RecurrenceKind::Schedule
    } else if has_due {
        RecurrenceKind::OneTime
    } else {
        RecurrenceKind::NoDate
    }
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    GracePeriod,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;
    let target = match field.as_str() {
        "grace" | "grace_period_minutes" | "default_grace_period_minutes" => {
            ConfigOverrideTarget::GracePeriod
        }
        "log" | "log_level" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::GracePeriod => {
                let minutes = parsed.value.parse::<u32>().map_err(|_| {
                    AppError::invalid_input(format!(
                        "grace period must be a whole number of minutes: {}",
                        parsed.value
                    ))
                })?;
                overrides.default_grace_period_minutes = Some(minutes);
            }
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
