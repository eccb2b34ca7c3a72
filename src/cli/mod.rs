//! CLI command definitions for gtd-board
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod export;
pub mod import;

use crate::format::OutputFormat;
use crate::types::{Priority, TaskId, TaskStatus};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use export::ExportArgs;
use import::ImportArgs;

/// GTD task board
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task at the end of its column
    Add(AddArgs),

    /// Move tasks (with their subtrees) to a column, parent and position
    Move(MoveArgs),

    /// Toggle completion of a task and cascade it
    Complete {
        id: TaskId,
    },

    /// Hide a task and its subtree
    Hide {
        id: TaskId,
    },

    /// Unhide a task and its subtree
    Show {
        id: TaskId,
    },

    /// Delete tasks with their subtrees
    Delete(DeleteArgs),

    /// Show the whole board as a tree
    Tree,

    /// List actionable leaf tasks
    Active {
        /// Include hidden tasks
        #[arg(long)]
        all: bool,
    },

    /// List high-priority and soon-due tasks
    Focus {
        /// Due-date window in days (overrides config)
        #[arg(long)]
        days: Option<i64>,
    },

    /// List tasks whose start date has arrived
    Today,

    /// List contexts, or the open tasks in one context
    Context(ContextArgs),

    /// Edit due date, priority or contexts of many tasks
    Bulk(BulkArgs),

    /// Export the board to JSON
    Export(ExportArgs),

    /// Replace the board with an exported JSON file
    Import(ImportArgs),

    /// Fill missing task paths
    Backfill {
        /// Recompute every path and sibling order, not just missing ones
        #[arg(long)]
        all: bool,
    },

    /// Check structural invariants
    Check,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,

    #[arg(short, long, value_enum, default_value_t = TaskStatus::Inbox)]
    pub status: TaskStatus,

    #[arg(short, long)]
    pub parent: Option<TaskId>,

    #[arg(long, value_enum, default_value_t = Priority::Medium)]
    pub priority: Priority,

    #[arg(long)]
    pub description: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Context tag; repeatable
    #[arg(long = "context")]
    pub contexts: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Comma-separated task ids
    #[arg(value_delimiter = ',', required = true)]
    pub ids: Vec<TaskId>,

    /// Destination column
    #[arg(short, long, value_enum)]
    pub to: TaskStatus,

    /// Destination parent (top level if omitted)
    #[arg(short, long)]
    pub parent: Option<TaskId>,

    /// Position among the destination siblings (end if omitted)
    #[arg(short, long)]
    pub index: Option<i64>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Comma-separated task ids
    #[arg(value_delimiter = ',', required_unless_present = "completed")]
    pub ids: Vec<TaskId>,

    /// Delete every completed task instead
    #[arg(long, conflicts_with = "ids")]
    pub completed: bool,
}

#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Context name, with or without the leading @
    pub name: Option<String>,

    /// Remove the context from every task
    #[arg(long, requires = "name")]
    pub delete: bool,
}

#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Comma-separated task ids
    #[arg(value_delimiter = ',', required = true)]
    pub ids: Vec<TaskId>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub add_context: Option<String>,

    #[arg(long)]
    pub remove_context: Option<String>,
}
