//! Read-only board views.
//!
//! These project the task set into ordered lists. They never repair or infer
//! structure.

use super::TaskSet;
use crate::types::{Priority, Task, TaskStatus, normalize_context};
use chrono::{NaiveDate, TimeDelta};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

/// Default look-ahead for the Focus view, today inclusive.
pub const DEFAULT_FOCUS_WINDOW_DAYS: i64 = 3;

/// Actionable leaves: not Inbox, not completed, started (or undated), and
/// not effectively hidden unless `show_hidden`. Ordered by status then sort
/// order.
pub fn active_tasks(set: &TaskSet, today: NaiveDate, show_hidden: bool) -> Vec<Task> {
    let index = set.children_index();
    let mut visited = HashSet::new();
    let mut active = Vec::new();

    // (id, an ancestor is hidden)
    let mut stack: Vec<(i64, bool)> = index.children(None).iter().map(|&id| (id, false)).collect();
    while let Some((id, parent_hidden)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(task) = set.get(id) else { continue };
        let effectively_hidden = parent_hidden || task.is_hidden;
        let is_leaf = !index.has_children(id);

        if (show_hidden || !effectively_hidden)
            && is_leaf
            && task.status != TaskStatus::Inbox
            && !task.is_completed
            && task.start_date.is_none_or(|start| start <= today)
        {
            active.push(task.clone());
        }

        for &child in index.children(Some(id)) {
            stack.push((child, effectively_hidden));
        }
    }

    active.sort_by_key(|t| (t.status, t.sort_order, t.id));
    active
}

/// Open tasks that are high priority or due within `window_days` of today
/// (overdue included). A negative window counts as zero; one past the end of
/// the calendar reaches every dated task.
pub fn focus_tasks(set: &TaskSet, today: NaiveDate, window_days: i64) -> Vec<Task> {
    let horizon = focus_horizon(today, window_days);
    let mut focus: Vec<Task> = set
        .iter()
        .filter(|t| !t.is_completed)
        .filter(|t| t.priority == Priority::High || t.due_date.is_some_and(|due| due <= horizon))
        .cloned()
        .collect();
    focus.sort_by(by_due_then_priority);
    focus
}

fn focus_horizon(today: NaiveDate, window_days: i64) -> NaiveDate {
    TimeDelta::try_days(window_days.max(0))
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX)
}

/// Open tasks whose start date has arrived.
pub fn today_tasks(set: &TaskSet, today: NaiveDate) -> Vec<Task> {
    let mut tasks: Vec<Task> = set
        .iter()
        .filter(|t| !t.is_completed && t.start_date.is_some_and(|start| start <= today))
        .cloned()
        .collect();
    tasks.sort_by(by_due_then_priority);
    tasks
}

/// Due date ascending with undated last, then priority descending.
fn by_due_then_priority(a: &Task, b: &Task) -> Ordering {
    let due = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    due.then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.id.cmp(&b.id))
}

/// Open tasks tagged with `context`, ordered by status then sort order.
pub fn tasks_by_context(set: &TaskSet, context: &str) -> Vec<Task> {
    let Some(context) = normalize_context(context) else {
        return Vec::new();
    };
    let mut tasks: Vec<Task> = set
        .iter()
        .filter(|t| !t.is_completed && t.contexts.contains(&context))
        .cloned()
        .collect();
    tasks.sort_by_key(|t| (t.status, t.sort_order, t.id));
    tasks
}

/// Every distinct context in use, sorted.
pub fn all_contexts(set: &TaskSet) -> Vec<String> {
    set.iter()
        .flat_map(|t| t.contexts.iter().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_support::set_of;
    use crate::types::TaskStatus::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn active_lists_open_started_leaves() {
        let mut set = set_of(&[
            (1, None, Projects, 0),
            (2, Some(1), Projects, 0),
            (3, None, Inbox, 0),
            (4, None, NextActions, 1),
            (5, None, NextActions, 0),
            (6, None, Someday, 0),
        ]);
        set.get_mut(5).unwrap().start_date = Some(day(20));
        set.get_mut(6).unwrap().is_completed = true;

        let active = active_tasks(&set, day(10), false);
        // 1 has a child, 3 is Inbox, 5 not started, 6 completed.
        assert_eq!(ids(&active), vec![4, 2]);
    }

    #[test]
    fn active_respects_hidden_ancestors() {
        let mut set = set_of(&[
            (1, None, Projects, 0),
            (2, Some(1), Projects, 0),
            (3, None, NextActions, 0),
        ]);
        // Only the parent bit is set; the live walk still hides the child.
        set.get_mut(1).unwrap().is_hidden = true;

        assert_eq!(ids(&active_tasks(&set, day(1), false)), vec![3]);
        assert_eq!(ids(&active_tasks(&set, day(1), true)), vec![3, 2]);
    }

    #[test]
    fn focus_includes_high_priority_and_due_soon() {
        let mut set = set_of(&[
            (1, None, NextActions, 0),
            (2, None, NextActions, 1),
            (3, None, NextActions, 2),
            (4, None, NextActions, 3),
            (5, None, NextActions, 4),
        ]);
        set.get_mut(1).unwrap().priority = Priority::High;
        set.get_mut(2).unwrap().due_date = Some(day(13));
        set.get_mut(3).unwrap().due_date = Some(day(14));
        set.get_mut(4).unwrap().due_date = Some(day(5));
        set.get_mut(5).unwrap().priority = Priority::High;
        set.get_mut(5).unwrap().is_completed = true;

        let focus = focus_tasks(&set, day(10), DEFAULT_FOCUS_WINDOW_DAYS);
        // 3 is outside the window; undated high priority sorts last.
        assert_eq!(ids(&focus), vec![4, 2, 1]);
    }

    #[test]
    fn focus_window_saturates_instead_of_overflowing() {
        let mut set = set_of(&[(1, None, NextActions, 0), (2, None, NextActions, 1)]);
        set.get_mut(1).unwrap().due_date = Some(day(1));
        set.get_mut(2).unwrap().due_date = NaiveDate::from_ymd_opt(9999, 12, 31);

        assert_eq!(ids(&focus_tasks(&set, day(10), i64::MAX)), vec![1, 2]);
        assert_eq!(ids(&focus_tasks(&set, day(10), 10_000_000)), vec![1, 2]);
        // Negative windows still show overdue work.
        assert_eq!(ids(&focus_tasks(&set, day(10), i64::MIN)), vec![1]);
        assert_eq!(focus_horizon(day(10), -5), day(10));
        assert_eq!(focus_horizon(day(10), i64::MAX), NaiveDate::MAX);
    }

    #[test]
    fn today_requires_start_date() {
        let mut set = set_of(&[
            (1, None, NextActions, 0),
            (2, None, NextActions, 1),
            (3, None, NextActions, 2),
        ]);
        set.get_mut(1).unwrap().start_date = Some(day(1));
        set.get_mut(2).unwrap().start_date = Some(day(1));
        set.get_mut(2).unwrap().priority = Priority::High;
        set.get_mut(3).unwrap().start_date = Some(day(30));

        assert_eq!(ids(&today_tasks(&set, day(10))), vec![2, 1]);
    }

    #[test]
    fn contexts_are_listed_and_filtered() {
        let mut set = set_of(&[(1, None, NextActions, 0), (2, None, Someday, 0)]);
        set.get_mut(1).unwrap().contexts = vec!["@home".into(), "@phone".into()];
        set.get_mut(2).unwrap().contexts = vec!["@home".into()];

        assert_eq!(all_contexts(&set), vec!["@home", "@phone"]);
        assert_eq!(ids(&tasks_by_context(&set, "home")), vec![1, 2]);
        assert!(tasks_by_context(&set, "").is_empty());
    }
}
