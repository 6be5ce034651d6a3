use crate::due::TaskView;
use crate::error::AppError;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const APP_NAME: &str = "chores";
const DISABLE_ENV_VAR: &str = "CHORES_DISABLE_NOTIFICATIONS";

/// What a reminder shows, independent of the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: String,
    pub title: String,
    pub body: String,
}

impl Reminder {
    pub fn for_view(view: &TaskView) -> Self {
        let task = &view.task;
        let due = task
            .next_due_datetime
            .as_deref()
            .or(task.next_due_date.as_deref())
            .unwrap_or("-");
        let body = match view.days_overdue {
            0 => format!("{} (due {})", task.title, due),
            1 => format!("{} (due {}, 1 day overdue)", task.title, due),
            days => format!("{} (due {}, {} days overdue)", task.title, due, days),
        };

        Self {
            task_id: task.id.clone(),
            title: APP_NAME.to_string(),
            body,
        }
    }
}

pub trait Notifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _reminder: &Reminder) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(AppError::InvalidData(reason)) => {
            tracing::debug!(%reason, "desktop notifications unavailable, using no-op notifier");
            Ok(Box::new(NoopNotifier))
        }
        Err(other) => Err(other),
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
