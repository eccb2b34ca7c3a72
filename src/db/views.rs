//! Read-only board views.

use super::{Database, today};
use crate::tree::filters;
use crate::types::Task;
use anyhow::Result;
use chrono::NaiveDate;

impl Database {
    /// Actionable leaves as of today.
    pub fn active_tasks(&self, show_hidden: bool) -> Result<Vec<Task>> {
        self.active_tasks_on(today(), show_hidden)
    }

    pub fn active_tasks_on(&self, today: NaiveDate, show_hidden: bool) -> Result<Vec<Task>> {
        Ok(filters::active_tasks(&self.task_set()?, today, show_hidden))
    }

    /// High-priority or soon-due open tasks as of today.
    pub fn focus_tasks(&self, window_days: i64) -> Result<Vec<Task>> {
        self.focus_tasks_on(today(), window_days)
    }

    pub fn focus_tasks_on(&self, today: NaiveDate, window_days: i64) -> Result<Vec<Task>> {
        Ok(filters::focus_tasks(&self.task_set()?, today, window_days))
    }

    /// Open tasks whose start date has arrived.
    pub fn today_tasks(&self) -> Result<Vec<Task>> {
        self.today_tasks_on(today())
    }

    pub fn today_tasks_on(&self, today: NaiveDate) -> Result<Vec<Task>> {
        Ok(filters::today_tasks(&self.task_set()?, today))
    }
}
