//! GTD board command line.

use anyhow::Result;
use clap::Parser;
use gtd_board::cli::{Cli, Command, ContextArgs, DeleteArgs};
use gtd_board::config::Config;
use gtd_board::db::Database;
use gtd_board::db::export::Snapshot;
use gtd_board::error::BoardError;
use gtd_board::format::{self, OutputFormat};
use gtd_board::logging::{self, LogTarget};
use gtd_board::types::{BulkUpdate, MoveRequest, NewTask, Task};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output_format = cli.format;

    if let Err(e) = logging::init(&LogTarget::parse(&cli.log), cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            let board_err = BoardError::from(e);
            match output_format {
                OutputFormat::Json => println!("{}", board_err.to_json()),
                OutputFormat::Markdown => eprintln!("Error: {}", board_err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String> {
    let mut config = Config::load_or_default(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    config.ensure_db_dir()?;

    debug!(db_path = %config.server.db_path.display(), "Opening board");
    let db = Database::open(&config.server.db_path)?;
    db.fill_path_depth()?;

    let fmt = cli.format;
    match cli.command {
        Command::Add(args) => {
            let task = db.create_task(NewTask {
                title: args.title,
                status: args.status,
                parent_id: args.parent,
                priority: args.priority,
                description: args.description,
                start_date: args.start,
                due_date: args.due,
                contexts: args.contexts,
            })?;
            format::render(fmt, &task, || format::format_task_markdown(&task))
        }
        Command::Move(args) => {
            let request = MoveRequest::new(
                args.ids,
                args.to,
                args.parent,
                args.index.unwrap_or(i64::MAX),
            );
            let outcome = db.move_tasks(&request)?;
            format::render(fmt, &outcome, || format::format_move_markdown(&outcome))
        }
        Command::Complete { id } => {
            let change = db.toggle_completion(id)?;
            format::render(fmt, &change, || {
                let verb = if change.completed { "Completed" } else { "Reopened" };
                format!("{} {} task(s)\n", verb, change.cascaded.len())
            })
        }
        Command::Hide { id } => visibility(&db, fmt, id, true),
        Command::Show { id } => visibility(&db, fmt, id, false),
        Command::Delete(DeleteArgs { ids, completed }) => {
            let deleted = if completed {
                db.delete_completed()?
            } else {
                db.delete_tasks(&ids)?
            };
            format::render(fmt, &json!({ "deleted": deleted }), || {
                format!("Deleted {} task(s)\n", deleted.len())
            })
        }
        Command::Tree => {
            let forest = db.get_tree()?;
            format::render(fmt, &forest, || format::format_tree_markdown(&forest))
        }
        Command::Active { all } => list(fmt, "Active", db.active_tasks(all)?),
        Command::Focus { days } => {
            let window = days.unwrap_or(config.board.focus_window_days);
            list(fmt, "Focus", db.focus_tasks(window)?)
        }
        Command::Today => list(fmt, "Today", db.today_tasks()?),
        Command::Context(ContextArgs { name, delete }) => match name {
            Some(name) if delete => {
                let changed = db.delete_context(&name)?;
                format::render(fmt, &json!({ "changed": changed }), || {
                    format!("Removed {} from {} task(s)\n", name, changed.len())
                })
            }
            Some(name) => list(fmt, &name, db.tasks_by_context(&name)?),
            None => {
                let contexts = db.all_contexts()?;
                format::render(fmt, &contexts, || {
                    contexts.iter().map(|c| format!("- {}\n", c)).collect()
                })
            }
        },
        Command::Bulk(args) => {
            let changed = db.bulk_update(&BulkUpdate {
                task_ids: args.ids,
                due_date: args.due,
                priority: args.priority,
                context_to_add: args.add_context,
                context_to_remove: args.remove_context,
            })?;
            format::render(fmt, &json!({ "changed": changed }), || {
                format!("Updated {} task(s)\n", changed.len())
            })
        }
        Command::Export(args) => {
            args.write(&db.export_json()?)?;
            Ok(String::new())
        }
        Command::Import(args) => {
            let content = args.read()?;
            let count = if args.dry_run {
                serde_json::from_str::<Snapshot>(&content)?.tasks.len()
            } else {
                db.import_json(&content)?
            };
            format::render(fmt, &json!({ "imported": count, "dryRun": args.dry_run }), || {
                let verb = if args.dry_run { "Would import" } else { "Imported" };
                format!("{} {} task(s)\n", verb, count)
            })
        }
        Command::Backfill { all } => {
            let written = if all { db.reindex_all()? } else { db.fill_path_depth()? };
            format::render(fmt, &json!({ "written": written }), || {
                format!("Wrote {} task(s)\n", written)
            })
        }
        Command::Check => {
            let issues = db.check_integrity()?;
            format::render(fmt, &issues, || format::format_issues_markdown(&issues))
        }
    }
}

fn visibility(db: &Database, fmt: OutputFormat, id: i64, hidden: bool) -> Result<String> {
    let changed = db.set_hidden(id, hidden)?;
    format::render(fmt, &json!({ "changed": changed }), || {
        let verb = if hidden { "Hid" } else { "Showed" };
        format!("{} {} task(s)\n", verb, changed.len())
    })
}

fn list(fmt: OutputFormat, heading: &str, tasks: Vec<Task>) -> Result<String> {
    format::render(fmt, &tasks, || format::format_tasks_markdown(heading, &tasks))
}
