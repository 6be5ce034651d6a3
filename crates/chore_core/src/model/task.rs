use serde::{Deserialize, Serialize};

pub const DEFAULT_GRACE_PERIOD_MINUTES: u32 = 120;

fn default_grace_period_minutes() -> u32 {
    DEFAULT_GRACE_PERIOD_MINUTES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub completed_at: String,
    #[serde(default)]
    pub was_overdue: bool,
    #[serde(default)]
    pub days_overdue: i64,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Stored task row. `recurrence_type` and `schedule_pattern` are kept in
/// their raw stored form and interpreted by [`crate::recurrence::Recurrence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub recurrence_type: String,
    #[serde(default)]
    pub interval_days: Option<i64>,
    #[serde(default)]
    pub interval_exclude_weekends: bool,
    /// JSON text such as `{"type":"weekly","weekdays":[1,4]}`.
    #[serde(default)]
    pub schedule_pattern: Option<String>,
    #[serde(default)]
    pub has_specific_time: bool,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default = "default_grace_period_minutes")]
    pub grace_period_minutes: u32,
    #[serde(default)]
    pub next_due_date: Option<String>,
    #[serde(default)]
    pub next_due_datetime: Option<String>,
    #[serde(default)]
    pub last_completed_at: Option<String>,
    #[serde(default)]
    pub completion_history: Vec<CompletionEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    OneTime,
    NoDate,
    Interval,
    Schedule,
    Inactive,
}

impl RecurrenceKind {
    pub const ALL: [RecurrenceKind; 5] = [
        Self::OneTime,
        Self::NoDate,
        Self::Interval,
        Self::Schedule,
        Self::Inactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneTime => "one_time",
            Self::NoDate => "no_date",
            Self::Interval => "interval",
            Self::Schedule => "schedule",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    /// Kinds that never carry a due date.
    pub fn is_undated(self) -> bool {
        matches!(self, Self::NoDate | Self::Inactive)
    }
}

impl Task {
    pub fn kind(&self) -> Option<RecurrenceKind> {
        RecurrenceKind::parse(&self.recurrence_type)
    }
}
