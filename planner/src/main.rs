//! `planner`: task planner client.
//!
//! ```bash
//! # Persist the sort mode used by task views
//! cargo run --bin planner -- sort date
//!
//! # Print every list from the task store API
//! cargo run --bin planner -- --api-url http://localhost:8080/api show
//!
//! # Scripted session against an in-process task store
//! cargo run --bin planner -- demo
//! PLANNER_LOG=debug cargo run --bin planner -- --log-file /tmp/planner.log
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use planner::config::{CliArgs, ClientConfig, Command};
use planner::engine::{MutationEvent, Planner, settle_all};
use planner::preferences;
use planner::remote::RemoteStore;
use planner::remote::http::UreqClient;
use planner::remote::memory::InMemoryRemote;
use planner::remote::rest::RestRemote;
use planner::view::{Filter, SortMode};
use planner_proto::task::{DueDate, NewTask, Task, TaskEdit, TaskListId};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(api_url = %config.api_url, "planner starting");

    let Some(prefs_path) = preferences_path(&config) else {
        eprintln!("error: no configuration directory; pass --preferences");
        return ExitCode::FAILURE;
    };

    let result = match cli.command.unwrap_or(Command::Demo) {
        Command::Sort { mode } => preferences::save_sort_mode(&prefs_path, mode)
            .map(|()| println!("sort mode set to {mode}"))
            .map_err(|e| e.to_string()),
        Command::Show => {
            let sort = preferences::load_sort_mode(&prefs_path);
            run_show(&config, sort).await.map_err(|e| e.to_string())
        }
        Command::Demo => {
            let sort = preferences::load_sort_mode(&prefs_path);
            run_demo(&config, sort).await.map_err(|e| e.to_string())
        }
    };

    tracing::info!("planner exiting");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Stdout carries the command's output, so logs go to a file. Returns a
/// [`WorkerGuard`] that must be held until shutdown to flush buffered
/// entries.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("planner.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn preferences_path(config: &ClientConfig) -> Option<PathBuf> {
    config
        .preferences_path
        .clone()
        .or_else(|| preferences::default_path().ok())
}

/// Loads every list and its tasks from the configured API and prints them.
async fn run_show(
    config: &ClientConfig,
    sort: SortMode,
) -> Result<(), planner::engine::MutationError> {
    let http = UreqClient::new(config.request_timeout);
    let remote = RestRemote::new(config.api_url.clone(), http);
    let (planner, _events) = Planner::new(remote, &config.engine_options());
    planner.load_lists().await?;
    let lists = planner.read(|s| {
        s.lists_in_order()
            .into_iter()
            .map(|l| (l.id, l.name.clone()))
            .collect::<Vec<_>>()
    });
    for (list, name) in lists {
        planner.load_tasks(list).await?;
        print_view(&planner, list, &name, sort);
    }
    Ok(())
}

/// Scripted session: seed a list, apply a few edits, fail one, print.
async fn run_demo(
    config: &ClientConfig,
    sort: SortMode,
) -> Result<(), planner::engine::MutationError> {
    let remote = InMemoryRemote::new();
    let inbox = remote.seed_list("Inbox");
    for (label, due) in [
        ("Write report", None),
        ("Buy milk", Some("2024-03-02T09:00:00Z")),
        ("call Alice", Some("2024-03-01T17:30:00Z")),
    ] {
        remote.seed_task(inbox, NewTask {
            label: label.to_string(),
            completed: false,
            due_date: due.map(DueDate::new),
        });
    }

    let (planner, mut events) = Planner::new(remote, &config.engine_options());
    planner.load_lists().await?;
    planner.load_tasks(inbox).await?;
    print_view(&planner, inbox, "loaded", sort);

    let (_, created) = planner.create_task(inbox, NewTask {
        label: "Book dentist".to_string(),
        completed: false,
        due_date: None,
    })?;
    let report = find_task(&planner, inbox, "Write report");
    let mut pending = vec![];
    if let Some(report) = report {
        pending.push(planner.toggle_completion(inbox, report)?);
    }
    created.settled().await?;
    for result in settle_all(pending).await {
        result?;
    }
    print_view(&planner, inbox, "after create and toggle", sort);

    planner.remote().fail_next(1);
    if let Some(milk) = find_task(&planner, inbox, "Buy milk") {
        let edit = planner.update_task(inbox, milk, TaskEdit {
            label: "Buy oat milk".to_string(),
            due_date: None,
        })?;
        print_view(&planner, inbox, "optimistic rename", sort);
        if let Err(error) = edit.settled().await {
            println!("rename failed: {error}");
        }
    }
    print_view(&planner, inbox, "after rollback", sort);

    print_events(&mut events);
    println!("{} requests sent", planner.remote().request_count());
    Ok(())
}

fn find_task(
    planner: &Planner<InMemoryRemote>,
    list: TaskListId,
    label: &str,
) -> Option<planner_proto::task::TaskId> {
    planner
        .visible_tasks(list, Filter::All, SortMode::Custom)
        .iter()
        .find(|t| t.label() == label)
        .map(Task::id)
}

fn print_view<R: RemoteStore>(
    planner: &Planner<R>,
    list: TaskListId,
    title: &str,
    sort: SortMode,
) {
    println!("== {title} (sort {sort})");
    for task in planner.visible_tasks(list, Filter::All, sort) {
        let mark = if task.completed() { 'x' } else { ' ' };
        let pending = planner.read(|s| s.is_pending(task.id().as_uuid()));
        let due = task
            .due_date()
            .map(|d| format!("  due {d}"))
            .unwrap_or_default();
        let flag = if pending { "  (saving)" } else { "" };
        println!("  [{mark}] {}{due}{flag}", task.label());
    }
}

fn print_events(events: &mut mpsc::Receiver<MutationEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            MutationEvent::Settled { mutation, kind } => println!("{mutation} {kind}: ok"),
            MutationEvent::RolledBack {
                mutation,
                kind,
                error,
            } => println!("{mutation} {kind}: rolled back ({error})"),
            MutationEvent::IdentityRewritten { temp, real } => {
                println!("identity {temp} -> {real}");
            }
        }
    }
}
