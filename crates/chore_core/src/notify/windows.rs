use crate::error::AppError;
use crate::notify::{Notifier, Reminder};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&reminder.title)
            .text1(&reminder.body)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        tracing::debug!(task_id = %reminder.task_id, "reminder shown");
        Ok(())
    }
}
