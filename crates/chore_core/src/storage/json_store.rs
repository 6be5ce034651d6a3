use crate::config::app_dir;
use crate::error::AppError;
use crate::model::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "CHORES_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredTasks {
    schema_version: u32,
    tasks: Vec<Task>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(STORE_FILE_NAME))
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredTasks =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    ensure_unique_ids(&stored.tasks)?;
    Ok(stored.tasks)
}

fn ensure_unique_ids(tasks: &[Task]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    match tasks.iter().find(|task| !seen.insert(task.id.as_str())) {
        Some(duplicate) => Err(AppError::invalid_data(format!(
            "duplicate task id: {}",
            duplicate.id
        ))),
        None => Ok(()),
    }
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredTasks {
        schema_version: SCHEMA_VERSION,
        tasks: tasks.to_vec(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SCHEMA_VERSION, load_tasks, save_tasks};
    use crate::model::{CompletionEntry, DEFAULT_GRACE_PERIOD_MINUTES, Task};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("chores-{nanos}-{file_name}"))
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let path = temp_path("missing.json");
        assert!(load_tasks(&path).unwrap().is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = temp_path("tasks.json");
        let task = Task {
            id: "task-1".to_string(),
            title: "vacuum".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            recurrence_type: "schedule".to_string(),
            interval_days: None,
            interval_exclude_weekends: false,
            schedule_pattern: Some(r#"{"type":"weekly","weekdays":[6]}"#.to_string()),
            has_specific_time: true,
            time_of_day: Some("09:00".to_string()),
            grace_period_minutes: 30,
            next_due_date: Some("2024-01-06".to_string()),
            next_due_datetime: Some("2024-01-06T09:00:00".to_string()),
            last_completed_at: None,
            completion_history: vec![CompletionEntry {
                completed_at: "2023-12-30T10:00:00Z".to_string(),
                was_overdue: true,
                days_overdue: 1,
                skipped: false,
                notes: Some("done late".to_string()),
            }],
        };

        save_tasks(&path, std::slice::from_ref(&task)).unwrap();
        let loaded = load_tasks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, vec![task]);
    }

    #[test]
    fn optional_fields_take_defaults() {
        let path = temp_path("minimal.json");
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "tasks": [
                {
                    "id": "task-1",
                    "title": "laundry",
                    "created_at": "2024-01-01T00:00:00Z",
                    "recurrence_type": "no_date"
                }
            ]
        });
        fs::write(&path, content.to_string()).unwrap();

        let loaded = load_tasks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded[0].grace_period_minutes, DEFAULT_GRACE_PERIOD_MINUTES);
        assert!(!loaded[0].has_specific_time);
        assert_eq!(loaded[0].next_due_date, None);
        assert!(loaded[0].completion_history.is_empty());
    }

    #[test]
    fn unknown_recurrence_type_still_loads() {
        let path = temp_path("unknown-type.json");
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "tasks": [
                {
                    "id": "task-1",
                    "title": "laundry",
                    "created_at": "2024-01-01T00:00:00Z",
                    "recurrence_type": "fortnightly"
                }
            ]
        });
        fs::write(&path, content.to_string()).unwrap();

        let loaded = load_tasks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded[0].recurrence_type, "fortnightly");
        assert_eq!(loaded[0].kind(), None);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let path = temp_path("duplicates.json");
        let task = serde_json::json!({
            "id": "task-1",
            "title": "laundry",
            "created_at": "2024-01-01T00:00:00Z",
            "recurrence_type": "no_date"
        });
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "tasks": [task.clone(), task]
        });
        fs::write(&path, content.to_string()).unwrap();

        let err = load_tasks(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn schema_version_must_match() {
        let path = temp_path("bad-schema.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"tasks\": []\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = load_tasks(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }
}
