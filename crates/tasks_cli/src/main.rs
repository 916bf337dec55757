use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io;
use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tasks_cli::cli::{Cli, Command, ConfigOverride, parse_config_override};
use tasks_core::client::{LocalTransport, ProcedureCaller};
use tasks_core::clock::{Clock, SystemClock};
use tasks_core::config::{
    Config, ConfigOverrides, Palette, load_config_with_fallback, merge_overrides,
    palette_for_theme,
};
use tasks_core::error::AppError;
use tasks_core::model::{TaskId, TaskSummary};
use tasks_core::notify::{Notice, NoticeBoard, NoticeKey, NoticeLevel, notifier_from_env};
use tasks_core::reconcile::TaskSession;
use tasks_core::router::Router;
use tasks_core::router::procedure::CreateTaskInput;
use tasks_core::storage::JsonFileStore;
use tasks_core::storage::json_store::store_path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASKS_LOG";

struct App {
    session: TaskSession,
    palette: Palette,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&TaskSummary> for TaskRow {
    fn from(task: &TaskSummary) -> Self {
        Self {
            id: task.id.get(),
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn resolve_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        eprintln!("WARNING: {err}");
    }

    let mut overrides = ConfigOverrides::default();
    for raw in raw_overrides {
        match parse_config_override(raw).map_err(AppError::validation)? {
            ConfigOverride::Theme(theme) => overrides.theme = Some(theme),
            ConfigOverride::NoticeTtlSecs(ttl) => overrides.notice_ttl_secs = Some(ttl),
            ConfigOverride::DesktopNotifications(enabled) => {
                overrides.desktop_notifications = Some(enabled)
            }
        }
    }

    Ok(merge_overrides(&loaded.config, &overrides))
}

fn build_app(config: &Config) -> Result<App, AppError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = JsonFileStore::new(store_path()?);
    tracing::debug!(path = %store.path().display(), "opening task store");

    let router = Arc::new(Router::new(Arc::new(store), Arc::clone(&clock)));
    let caller = Arc::new(ProcedureCaller::new(Arc::new(LocalTransport::new(router))));

    let mut notices = NoticeBoard::new(clock, config.notice_ttl());
    if config.desktop_notifications {
        notices = notices.with_sink(notifier_from_env()?);
    }

    Ok(App {
        session: TaskSession::new(caller, notices),
        palette: palette_for_theme(config.theme.as_deref()),
    })
}

fn print_tasks_plain(palette: &Palette, tasks: &[TaskSummary]) {
    if tasks.is_empty() {
        println!("{}", palette.mutedize("No open tasks."));
        return;
    }

    let mut table = Table::new(tasks.iter().map(TaskRow::from));
    table.with(Style::psql());
    println!("{table}");
}

fn print_json(value: &serde_json::Value) {
    println!("{value}");
}

fn level_label(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "success",
        NoticeLevel::Error => "error",
    }
}

fn print_notices(palette: &Palette, notices: &[Notice], json: bool) {
    if json {
        let payload = notices
            .iter()
            .map(|notice| {
                serde_json::json!({
                    "key": notice.key.to_string(),
                    "title": notice.title,
                    "level": level_label(notice.level),
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(payload));
        return;
    }

    if notices.is_empty() {
        println!("{}", palette.mutedize("No notices."));
        return;
    }

    for notice in notices {
        let title = match notice.level {
            NoticeLevel::Success => palette.accentize(&notice.title),
            NoticeLevel::Error => palette.errorize(&notice.title),
        };
        println!("{} | {}", palette.mutedize(&notice.key.to_string()), title);
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
        } else if in_quotes && ch == '\\' {
            escape = true;
        } else if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }

    if in_quotes {
        return Err(AppError::validation("unterminated quote in command"));
    }
    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    println!("{}", cmd.render_help());
}

async fn run_command(app: &App, command: Command, json: bool) -> Result<(), AppError> {
    let session = &app.session;
    match command {
        Command::Add { title, description } => {
            let title = match title {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::validation("title is required")),
            };
            let description = description.unwrap_or_default();

            session
                .create_task(CreateTaskInput::new(title.clone(), description.clone()))
                .await?;
            if json {
                print_json(&serde_json::json!({
                    "title": title,
                    "description": description,
                }));
            } else {
                println!("Added task: {title}");
            }
        }
        Command::Done { id } => {
            let id = TaskId(id);
            session.refresh().await?;
            let title = session
                .visible_tasks()
                .into_iter()
                .find(|task| task.id == id)
                .map(|task| task.title);

            session.complete_task(id).await?;
            if json {
                print_json(&serde_json::json!({ "id": id, "completed": title.is_some() }));
            } else {
                match title {
                    Some(title) => println!("Completed task: {title} ({id})"),
                    None => println!("{}", app.palette.mutedize(&format!("No open task {id}"))),
                }
            }
        }
        Command::List => {
            session.refresh().await?;
            let tasks = session.visible_tasks();
            if json {
                let payload = serde_json::to_value(&tasks)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?;
                print_json(&payload);
            } else {
                print_tasks_plain(&app.palette, &tasks);
            }
        }
        Command::Notices => {
            print_notices(&app.palette, &session.notices(), json);
        }
        Command::Dismiss { key } => {
            let key: NoticeKey = key.parse()?;
            if !session.dismiss_notice(key) {
                return Err(AppError::not_found(format!("no active notice {key}")));
            }
            if !json {
                println!("Dismissed notice {key}");
            }
        }
    }

    Ok(())
}

async fn run_interactive(app: &App) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(input) = lines
        .next_line()
        .await
        .map_err(|err| AppError::io(err.to_string()))?
    {
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) if args.is_empty() => continue,
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {err}");
                continue;
            }
        };

        let argv = std::iter::once("tasks".to_string()).chain(args);
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            eprintln!(
                "ERROR: {}",
                AppError::validation("--config-override only applies when starting tasks")
            );
            continue;
        }

        if let Err(err) = run_command(app, cli.command, cli.json).await {
            eprintln!("ERROR: {err}");
        }
    }

    Ok(())
}

async fn run() -> Result<(), AppError> {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let app = build_app(&resolve_config(&[])?)?;
        return run_interactive(&app).await;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return Err(normalize_parse_error(err)),
    };
    let app = build_app(&resolve_config(&cli.config_override)?)?;
    run_command(&app, cli.command, cli.json).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::split_command_line;

    #[test]
    fn split_command_line_respects_quotes() {
        let args = split_command_line(r#"add "Buy milk" "2% \"fresh\"""#).unwrap();
        assert_eq!(args, vec!["add", "Buy milk", "2% \"fresh\""]);
    }

    #[test]
    fn split_command_line_rejects_open_quote() {
        let err = split_command_line(r#"add "Buy milk"#).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
