use crate::error::AppError;
use crate::notify::{Notifier, Reminder};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        Notification::new()
            .summary(&reminder.title)
            .body(&reminder.body)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        tracing::debug!(task_id = %reminder.task_id, "reminder shown");
        Ok(())
    }
}
