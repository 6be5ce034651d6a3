use chore_core::due::TaskView;
use chore_core::model::Task;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    recurrence: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl TaskRow {
    fn from_view(view: &TaskView) -> Self {
        Self {
            id: view.task.id.clone(),
            title: view.task.title.clone(),
            recurrence: view.task.recurrence_type.clone(),
            due: due_text(&view.task).to_string(),
            status: status_label(view),
        }
    }
}

pub fn due_text(task: &Task) -> &str {
    task.next_due_datetime
        .as_deref()
        .or(task.next_due_date.as_deref())
        .unwrap_or("-")
}

pub fn status_label(view: &TaskView) -> String {
    if view.is_overdue {
        return match view.days_overdue {
            0 => "overdue".to_string(),
            1 => "overdue 1 day".to_string(),
            days => format!("overdue {days} days"),
        };
    }

    match view.days_until_due {
        None => "-".to_string(),
        Some(0) => "due today".to_string(),
        Some(1) => "due tomorrow".to_string(),
        Some(days) if days > 1 => format!("in {days} days"),
        // Timed task past its date but still inside the grace period.
        Some(_) => "in grace period".to_string(),
    }
}

pub fn task_table(views: &[TaskView]) -> String {
    let rows: Vec<TaskRow> = views.iter().map(TaskRow::from_view).collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    table.to_string()
}

pub fn task_details(view: &TaskView) -> String {
    let task = &view.task;
    let mut lines = vec![
        format!("ID: {}", task.id),
        format!("Title: {}", task.title),
        format!("Type: {}", task.recurrence_type),
    ];

    if let Some(days) = task.interval_days {
        let weekends = if task.interval_exclude_weekends {
            ", weekdays only"
        } else {
            ""
        };
        lines.push(format!("Every: {days} days{weekends}"));
    }
    if let Some(pattern) = task.schedule_pattern.as_deref() {
        lines.push(format!("Schedule: {pattern}"));
    }
    if let Some(time_of_day) = task.time_of_day.as_deref() {
        lines.push(format!(
            "At: {} (grace {} min)",
            time_of_day, task.grace_period_minutes
        ));
    }

    lines.push(format!("Due: {}", due_text(task)));
    lines.push(format!("Status: {}", status_label(view)));
    lines.push(format!(
        "Last completed: {}",
        task.last_completed_at.as_deref().unwrap_or("-")
    ));
    lines.push(format!("Created: {}", task.created_at));

    if !task.completion_history.is_empty() {
        lines.push("History:".to_string());
        for entry in &task.completion_history {
            let action = if entry.skipped { "skipped" } else { "done" };
            let mut line = format!("  {} {}", entry.completed_at, action);
            if entry.was_overdue {
                line.push_str(&format!(" ({} days late)", entry.days_overdue));
            }
            if let Some(notes) = entry.notes.as_deref() {
                line.push_str(&format!(": {notes}"));
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}
