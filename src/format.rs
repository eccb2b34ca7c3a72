//! Output formatting utilities for markdown and JSON.

use crate::tree::check::IntegrityIssue;
use crate::types::{MoveOutcome, Priority, Task, TaskStatus, TaskTree};
use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Render `value` as pretty JSON, or `markdown` otherwise.
pub fn render<T: Serialize>(format: OutputFormat, value: &T, markdown: impl FnOnce() -> String) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Markdown => Ok(markdown()),
    }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority));

    if let Some(parent_id) = task.parent_id {
        md.push_str(&format!("- **parent_id**: `{}`\n", parent_id));
    }
    if let Some(start) = task.start_date {
        md.push_str(&format!("- **start**: {}\n", start));
    }
    if let Some(due) = task.due_date {
        md.push_str(&format!("- **due**: {}\n", due));
    }
    if !task.contexts.is_empty() {
        md.push_str(&format!("- **contexts**: {}\n", task.contexts.join(", ")));
    }
    if task.is_hidden {
        md.push_str("- **hidden**: yes\n");
    }
    md.push_str(&format!("- **path**: `{}`\n", task.path));

    if let Some(ref desc) = task.description {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }

    md
}

/// Format a list of tasks as markdown, grouped by status column.
pub fn format_tasks_markdown(heading: &str, tasks: &[Task]) -> String {
    let mut md = format!("# {} ({})\n\n", heading, tasks.len());

    for status in TaskStatus::ALL {
        let in_status: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if in_status.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", status));
        for task in in_status {
            md.push_str(&format!("- {}\n", format_task_short(task)));
        }
        md.push('\n');
    }

    md
}

/// Format the board forest as an indented outline. Collapsed tasks show a
/// child count instead of their children.
pub fn format_tree_markdown(forest: &[TaskTree]) -> String {
    let mut md = String::from("# Board\n\n");
    let mut current_status = None;
    for node in forest {
        if current_status != Some(node.task.status) {
            current_status = Some(node.task.status);
            md.push_str(&format!("\n## {}\n\n", node.task.status));
        }
        push_tree_node(&mut md, node, 0);
    }
    md
}

fn push_tree_node(md: &mut String, node: &TaskTree, indent: usize) {
    let collapsed = !node.task.is_expanded && !node.children.is_empty();
    let suffix = if collapsed {
        format!(" (+{})", node.children.len())
    } else {
        String::new()
    };
    md.push_str(&format!(
        "{}- {}{}\n",
        "  ".repeat(indent),
        format_task_short(&node.task),
        suffix
    ));
    if !collapsed {
        for child in &node.children {
            push_tree_node(md, child, indent + 1);
        }
    }
}

/// Format a task in short form for lists.
fn format_task_short(task: &Task) -> String {
    let priority_marker = match task.priority {
        Priority::High => "!!! ",
        Priority::Medium | Priority::Low => "",
    };
    let done = if task.is_completed { "[x] " } else { "" };
    let due = task
        .due_date
        .map(|d| format!(" (due {})", d))
        .unwrap_or_default();
    let contexts = if task.contexts.is_empty() {
        String::new()
    } else {
        format!(" {}", task.contexts.join(" "))
    };

    format!(
        "{}{}{} `{}`{}{}",
        done, priority_marker, task.title, task.id, due, contexts
    )
}

/// Describe a move result.
pub fn format_move_markdown(outcome: &MoveOutcome) -> String {
    match outcome {
        MoveOutcome::Applied { roots, affected } => {
            let ids: Vec<String> = roots.iter().map(|id| format!("`{}`", id)).collect();
            format!("Moved {} ({} tasks affected)\n", ids.join(", "), affected)
        }
        MoveOutcome::NoOp { reason } => format!("Nothing moved: {}\n", reason.as_str()),
    }
}

/// Format integrity problems, or a clean bill of health.
pub fn format_issues_markdown(issues: &[IntegrityIssue]) -> String {
    if issues.is_empty() {
        return "Board is consistent\n".to_string();
    }
    let mut md = format!("# Integrity issues ({})\n\n", issues.len());
    for issue in issues {
        md.push_str(&format!("- {}\n", issue));
    }
    md
}
