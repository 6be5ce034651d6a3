use chore_cli::cli::{Cli, Command, collect_config_overrides};
use chore_cli::render::{due_text, task_details, task_table};
use chore_core::calendar::parse_date;
use chore_core::config::{Config, load_config_with_fallback, merge_overrides};
use chore_core::due::TaskView;
use chore_core::error::AppError;
use chore_core::model::Task;
use chore_core::task_api::{self, Postpone};
use clap::Parser;
use time::Date;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "CHORES_LOG";

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json(value: serde_json::Value) {
    println!("{value}");
}

fn print_task_json(task: &Task) -> Result<(), AppError> {
    let value =
        serde_json::to_value(task).map_err(|err| AppError::invalid_data(err.to_string()))?;
    print_json(value);
    Ok(())
}

fn print_view_json(view: &TaskView) -> Result<(), AppError> {
    let value =
        serde_json::to_value(view).map_err(|err| AppError::invalid_data(err.to_string()))?;
    print_json(value);
    Ok(())
}

fn print_views_json(views: &[TaskView]) -> Result<(), AppError> {
    let value =
        serde_json::to_value(views).map_err(|err| AppError::invalid_data(err.to_string()))?;
    print_json(value);
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn postpone_from_args(to: Option<String>, days: Option<i64>) -> Result<Postpone, AppError> {
    match (to, days) {
        (Some(value), _) => {
            let date: Date = parse_date(value.trim())
                .map_err(|_| AppError::invalid_input("--to must be YYYY-MM-DD"))?;
            Ok(Postpone::To(date))
        }
        (None, Some(days)) => Ok(Postpone::ByDays(days)),
        (None, None) => Err(AppError::invalid_input("either --to or --days is required")),
    }
}

fn run_command(cli: Cli, config: &Config) -> Result<(), AppError> {
    match cli.command {
        Command::Add(args) => {
            let new_task = args.into_new_task(config.grace_period_minutes())?;
            let task = task_api::create_task(&new_task)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!(
                    "Added task: {} ({}) due {}",
                    task.title,
                    task.id,
                    due_text(&task)
                );
            }
        }
        Command::Edit(args) => {
            let id = args.id.clone();
            let task = task_api::update_task(&id, &args.into_update()?)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!(
                    "Updated task: {} ({}) due {}",
                    task.title,
                    task.id,
                    due_text(&task)
                );
            }
        }
        Command::List => {
            let views = task_api::list_tasks()?;
            if cli.json {
                print_views_json(&views)?;
            } else if views.is_empty() {
                println!("No tasks.");
            } else {
                println!("{}", task_table(&views));
            }
        }
        Command::Show { id } => {
            let view = task_api::get_task(&id)?;
            if cli.json {
                print_view_json(&view)?;
            } else {
                println!("{}", task_details(&view));
            }
        }
        Command::Done { id, message } => {
            let task = task_api::complete_task(&id, message.as_deref())?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!(
                    "Completed task: {} ({}), next due {}",
                    task.title,
                    task.id,
                    due_text(&task)
                );
            }
        }
        Command::Skip { id, message } => {
            let task = task_api::skip_task(&id, message.as_deref())?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!(
                    "Skipped task: {} ({}), next due {}",
                    task.title,
                    task.id,
                    due_text(&task)
                );
            }
        }
        Command::Postpone { id, to, days } => {
            let task = task_api::postpone_task(&id, postpone_from_args(to, days)?)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!(
                    "Postponed task: {} ({}) to {}",
                    task.title,
                    task.id,
                    due_text(&task)
                );
            }
        }
        Command::Next { id, from } => {
            let next_due = task_api::preview_next_due(&id, from.as_deref())?;
            if cli.json {
                print_json(serde_json::json!({
                    "id": id.trim(),
                    "next_due_date": next_due,
                }));
            } else {
                println!(
                    "Next due for {}: {}",
                    id.trim(),
                    next_due.as_deref().unwrap_or("none")
                );
            }
        }
        Command::Delete { id } => {
            let task = task_api::delete_task(&id)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Deleted task: {} ({})", task.title, task.id);
            }
        }
        Command::Notify => {
            let outcome = task_api::notify_overdue()?;
            for failure in &outcome.failures {
                eprintln!("WARN: {} - {}", failure.task_id, failure.error);
            }
            if cli.json {
                print_views_json(&outcome.tasks)?;
            } else if outcome.tasks.is_empty() && outcome.failures.is_empty() {
                println!("No overdue tasks.");
            } else {
                for view in &outcome.tasks {
                    println!("Notified task: {} ({})", view.task.title, view.task.id);
                }
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let loaded = load_config_with_fallback();
    let overrides = match collect_config_overrides(&cli.config_override) {
        Ok(overrides) => overrides,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };
    let config = merge_overrides(&loaded.config, &overrides);
    init_logging(&config);

    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "config could not be loaded, using defaults");
    }

    if let Err(err) = run_command(cli, &config) {
        if err.is_internal() {
            tracing::error!(code = err.code(), message = err.message(), "command failed");
        }
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
