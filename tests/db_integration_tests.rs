//! Integration tests for the database layer.
//!
//! These tests verify the board operations using an in-memory SQLite database.
//! Tests are organized by module and functionality.

use chrono::NaiveDate;
use gtd_board::db::Database;
use gtd_board::error::BoardError;
use gtd_board::types::{MoveOutcome, MoveRequest, NewTask, NoOpReason, Priority, Scope, Task, TaskId, TaskStatus};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn add(db: &Database, title: &str, status: TaskStatus, parent: Option<TaskId>) -> Task {
    let mut input = NewTask::new(title, status);
    input.parent_id = parent;
    db.create_task(input).expect("Failed to create task")
}

fn get(db: &Database, id: TaskId) -> Task {
    db.get_task(id).unwrap().expect("task exists")
}

/// Ids of a scope in sibling order.
fn scope_ids(db: &Database, parent: Option<TaskId>, status: TaskStatus) -> Vec<TaskId> {
    db.task_set().unwrap().scope_members(Scope::new(parent, status))
}

fn orders(db: &Database, ids: &[TaskId]) -> Vec<i64> {
    ids.iter().map(|&id| get(db, id).sort_order).collect()
}

fn board_error(err: &anyhow::Error) -> &BoardError {
    err.downcast_ref::<BoardError>().expect("typed board error")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_appends_to_scope_with_path() {
        let db = setup_db();

        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let child = add(&db, "child", TaskStatus::Projects, Some(a.id));

        assert_eq!(a.sort_order, 0);
        assert_eq!(b.sort_order, 1);
        assert_eq!(a.path, format!("{:06}", a.id));
        assert_eq!(a.depth, 0);
        assert_eq!(child.sort_order, 0);
        assert_eq!(child.path, format!("{:06}/{:06}", a.id, child.id));
        assert_eq!(child.depth, 1);
        assert!(child.is_expanded);
        assert!(child.created_at > 0);
    }

    #[test]
    fn create_task_rejects_missing_parent() {
        let db = setup_db();

        let err = db
            .create_task(NewTask::new("orphan", TaskStatus::Inbox).under(42))
            .unwrap_err();

        assert!(matches!(board_error(&err), BoardError::TaskNotFound(42)));
        assert!(db.list_tasks().unwrap().is_empty());
    }

    #[test]
    fn create_task_normalizes_contexts() {
        let db = setup_db();

        let mut input = NewTask::new("call", TaskStatus::NextActions);
        input.contexts = vec!["phone".into(), "@phone".into(), "home".into()];
        let task = db.create_task(input).unwrap();

        assert_eq!(task.contexts, vec!["@phone", "@home"]);
    }

    #[test]
    fn update_task_ignores_structural_fields() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);

        let mut edited = a.clone();
        edited.title = "renamed".into();
        edited.priority = Priority::High;
        edited.due_date = Some(day(20));
        edited.status = TaskStatus::Someday;
        edited.sort_order = 9;
        edited.path = "bogus".into();

        let saved = db.update_task(&edited).unwrap();
        assert_eq!(saved.title, "renamed");
        assert_eq!(saved.priority, Priority::High);
        assert_eq!(saved.due_date, Some(day(20)));
        assert_eq!(saved.status, TaskStatus::Inbox);
        assert_eq!(saved.sort_order, 0);
        assert_eq!(saved.path, a.path);
    }

    #[test]
    fn update_task_cascades_hidden_flag() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c = add(&db, "c", TaskStatus::Projects, Some(r.id));

        let mut edited = get(&db, r.id);
        edited.is_hidden = true;
        db.update_task(&edited).unwrap();

        assert!(get(&db, c.id).is_hidden);
    }

    #[test]
    fn update_missing_task_fails() {
        let db = setup_db();
        let ghost = Task::new(77, "ghost", TaskStatus::Inbox);

        let err = db.update_task(&ghost).unwrap_err();
        assert!(matches!(board_error(&err), BoardError::TaskNotFound(77)));
    }

    #[test]
    fn set_expanded_reports_change() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Projects, None);

        assert!(db.set_expanded(a.id, false).unwrap());
        assert!(!db.set_expanded(a.id, false).unwrap());
        assert!(!get(&db, a.id).is_expanded);
        assert!(db.set_expanded(999, true).is_err());
    }

    #[test]
    fn get_tree_nests_children() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c1 = add(&db, "c1", TaskStatus::Projects, Some(r.id));
        let c2 = add(&db, "c2", TaskStatus::Projects, Some(r.id));
        add(&db, "other", TaskStatus::Inbox, None);

        let forest = db.get_tree().unwrap();
        assert_eq!(forest.len(), 2);
        let project = forest.iter().find(|n| n.task.id == r.id).unwrap();
        let children: Vec<TaskId> = project.children.iter().map(|n| n.task.id).collect();
        assert_eq!(children, vec![c1.id, c2.id]);
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn delete_removes_subtree_and_renumbers() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, Some(b.id));
        let g = add(&db, "g", TaskStatus::Someday, Some(c.id));
        let d = add(&db, "d", TaskStatus::Inbox, None);

        let mut deleted = db.delete_tasks(&[b.id, 999]).unwrap();
        deleted.sort();
        assert_eq!(deleted, vec![b.id, c.id, g.id]);

        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![a.id, d.id]);
        assert_eq!(get(&db, d.id).sort_order, 1);
        assert!(db.check_integrity().unwrap().is_empty());
    }

    #[test]
    fn delete_completed_takes_subtrees() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c = add(&db, "c", TaskStatus::Projects, Some(r.id));
        let keep = add(&db, "keep", TaskStatus::Projects, None);
        db.toggle_completion(r.id).unwrap();

        let mut deleted = db.delete_completed().unwrap();
        deleted.sort();
        assert_eq!(deleted, vec![r.id, c.id]);

        let remaining: Vec<TaskId> = db.list_tasks().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![keep.id]);
        assert_eq!(get(&db, keep.id).sort_order, 0);
    }

    #[test]
    fn delete_nothing_is_empty() {
        let db = setup_db();
        assert!(db.delete_tasks(&[]).unwrap().is_empty());
        assert!(db.delete_completed().unwrap().is_empty());
    }
}

mod move_tests {
    use super::*;

    #[test]
    fn cross_scope_move_renumbers_both_scopes() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, None);
        let d = add(&db, "d", TaskStatus::NextActions, None);
        let e = add(&db, "e", TaskStatus::NextActions, None);

        let outcome = db.move_task(b.id, TaskStatus::NextActions, None, 1).unwrap();
        assert!(outcome.is_applied());

        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![a.id, c.id]);
        assert_eq!(orders(&db, &[a.id, c.id]), vec![0, 1]);
        assert_eq!(scope_ids(&db, None, TaskStatus::NextActions), vec![d.id, b.id, e.id]);
        assert_eq!(orders(&db, &[d.id, b.id, e.id]), vec![0, 1, 2]);
        assert_eq!(get(&db, b.id).status, TaskStatus::NextActions);
    }

    #[test]
    fn round_trip_restores_source_order() {
        let db = setup_db();
        let ids: Vec<TaskId> = ["a", "b", "c", "d"]
            .iter()
            .map(|t| add(&db, t, TaskStatus::Inbox, None).id)
            .collect();
        add(&db, "x", TaskStatus::Someday, None);
        let before = orders(&db, &ids);

        db.move_task(ids[2], TaskStatus::Someday, None, 0).unwrap();
        db.move_task(ids[2], TaskStatus::Inbox, None, 2).unwrap();

        assert_eq!(orders(&db, &ids), before);
        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), ids);
    }

    #[test]
    fn subtree_travels_with_new_status_and_paths() {
        let db = setup_db();
        let p = add(&db, "p", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, Some(p.id));
        let g = add(&db, "g", TaskStatus::Inbox, Some(c.id));
        let target = add(&db, "target", TaskStatus::Projects, None);

        let outcome = db
            .move_tasks(&MoveRequest::new(vec![p.id], TaskStatus::Projects, Some(target.id), 0))
            .unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                roots: vec![p.id],
                affected: 3
            }
        );

        let moved_g = get(&db, g.id);
        assert_eq!(moved_g.status, TaskStatus::Projects);
        assert_eq!(moved_g.parent_id, Some(c.id));
        assert_eq!(
            moved_g.path,
            format!("{:06}/{:06}/{:06}/{:06}", target.id, p.id, c.id, g.id)
        );
        assert_eq!(moved_g.depth, 3);
        assert!(db.check_integrity().unwrap().is_empty());
    }

    #[test]
    fn selected_child_stays_under_selected_parent() {
        let db = setup_db();
        let p = add(&db, "p", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, Some(p.id));
        add(&db, "d", TaskStatus::Someday, None);

        db.move_tasks(&MoveRequest::new(vec![c.id, p.id], TaskStatus::Someday, None, 0))
            .unwrap();

        assert_eq!(get(&db, c.id).parent_id, Some(p.id));
        assert_eq!(get(&db, p.id).parent_id, None);
        assert_eq!(scope_ids(&db, None, TaskStatus::Someday)[0], p.id);
    }

    #[test]
    fn ancestor_and_nested_grandchild_keep_scopes_contiguous() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, Some(a.id));
        let c1 = add(&db, "c1", TaskStatus::Inbox, Some(b.id));
        let c2 = add(&db, "c2", TaskStatus::Inbox, Some(b.id));
        let c3 = add(&db, "c3", TaskStatus::Inbox, Some(b.id));
        add(&db, "other", TaskStatus::Someday, None);

        let outcome = db
            .move_tasks(&MoveRequest::new(vec![a.id, c2.id], TaskStatus::Inbox, None, 0))
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(get(&db, c2.id).parent_id, None);
        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![a.id, c2.id]);
        assert_eq!(scope_ids(&db, Some(b.id), TaskStatus::Inbox), vec![c1.id, c3.id]);
        assert_eq!(orders(&db, &[c1.id, c3.id]), vec![0, 1]);
        assert!(db.check_integrity().unwrap().is_empty());
    }

    #[test]
    fn cycle_attempt_changes_nothing() {
        let db = setup_db();
        let p = add(&db, "p", TaskStatus::Projects, None);
        let c = add(&db, "c", TaskStatus::Projects, Some(p.id));
        add(&db, "g", TaskStatus::Projects, Some(c.id));
        let before = db.list_tasks().unwrap();

        let outcome = db.move_task(p.id, TaskStatus::Projects, Some(c.id), 0).unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::NoOp {
                reason: NoOpReason::Cycle
            }
        );
        assert_eq!(db.list_tasks().unwrap(), before);
    }

    #[test]
    fn stale_and_empty_selections_are_noops() {
        let db = setup_db();
        add(&db, "a", TaskStatus::Inbox, None);

        let stale = db.move_tasks(&MoveRequest::new(vec![500], TaskStatus::Someday, None, 0)).unwrap();
        assert_eq!(stale, MoveOutcome::NoOp { reason: NoOpReason::StaleIds });

        let empty = db.move_tasks(&MoveRequest::new(vec![], TaskStatus::Someday, None, 0)).unwrap();
        assert_eq!(empty, MoveOutcome::NoOp { reason: NoOpReason::EmptySelection });
    }

    #[test]
    fn missing_destination_parent_is_noop() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);

        let outcome = db.move_task(a.id, TaskStatus::Inbox, Some(404), 0).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::NoOp {
                reason: NoOpReason::MissingParent
            }
        );
        assert_eq!(get(&db, a.id).parent_id, None);
    }

    #[test]
    fn insertion_index_is_clamped() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, None);

        db.move_task(a.id, TaskStatus::Inbox, None, 100).unwrap();
        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![b.id, c.id, a.id]);

        db.move_task(a.id, TaskStatus::Inbox, None, -5).unwrap();
        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![a.id, b.id, c.id]);
        assert_eq!(orders(&db, &[a.id, b.id, c.id]), vec![0, 1, 2]);
    }

    #[test]
    fn multiple_roots_keep_relative_order() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, None);
        let x = add(&db, "x", TaskStatus::NextActions, None);

        // Given out of order; current sort order wins.
        db.move_tasks(&MoveRequest::new(vec![c.id, a.id], TaskStatus::NextActions, None, 1))
            .unwrap();

        assert_eq!(scope_ids(&db, None, TaskStatus::NextActions), vec![x.id, a.id, c.id]);
        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![b.id]);
        assert_eq!(get(&db, b.id).sort_order, 0);
    }

    #[test]
    fn moves_from_two_threads_keep_invariants() {
        let db = setup_db();
        let ids: Vec<TaskId> = (0..6)
            .map(|i| add(&db, &format!("t{}", i), TaskStatus::Inbox, None).id)
            .collect();

        let handles: Vec<_> = (0..2)
            .map(|n| {
                let db = db.clone();
                let ids = ids.clone();
                std::thread::spawn(move || {
                    for (i, &id) in ids.iter().enumerate() {
                        let status = if (i + n) % 2 == 0 {
                            TaskStatus::NextActions
                        } else {
                            TaskStatus::Inbox
                        };
                        db.move_task(id, status, None, i as i64).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(db.check_integrity().unwrap().is_empty());
    }
}

mod cascade_tests {
    use super::*;

    #[test]
    fn completing_all_children_completes_parent() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c1 = add(&db, "c1", TaskStatus::Projects, Some(r.id));
        let c2 = add(&db, "c2", TaskStatus::Projects, Some(r.id));

        db.toggle_completion(c1.id).unwrap();
        assert!(!get(&db, r.id).is_completed);

        let change = db.toggle_completion(c2.id).unwrap();
        assert!(change.completed);
        assert!(change.cascaded.contains(&r.id));

        let root = get(&db, r.id);
        assert!(root.is_completed);
        assert_eq!(root.status, TaskStatus::Completed);
        assert_eq!(root.original_status, Some(TaskStatus::Projects));
        assert!(db.check_integrity().unwrap().is_empty());
    }

    #[test]
    fn uncompleting_restores_status() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Someday, None);

        db.toggle_completion(a.id).unwrap();
        assert_eq!(get(&db, a.id).status, TaskStatus::Completed);

        let change = db.toggle_completion(a.id).unwrap();
        assert!(!change.completed);
        let task = get(&db, a.id);
        assert_eq!(task.status, TaskStatus::Someday);
        assert_eq!(task.original_status, None);
    }

    #[test]
    fn toggle_missing_task_fails() {
        let db = setup_db();
        let err = db.toggle_completion(3).unwrap_err();
        assert!(matches!(board_error(&err), BoardError::TaskNotFound(3)));
    }

    #[test]
    fn hidden_flag_cascades_and_reverts() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c = add(&db, "c", TaskStatus::Projects, Some(r.id));
        let g = add(&db, "g", TaskStatus::Projects, Some(c.id));

        let changed = db.set_hidden(r.id, true).unwrap();
        assert_eq!(changed.len(), 3);
        assert!(get(&db, c.id).is_hidden);
        assert!(get(&db, g.id).is_hidden);

        db.set_hidden(r.id, false).unwrap();
        assert!(!get(&db, c.id).is_hidden);
        assert!(!get(&db, g.id).is_hidden);

        assert!(db.set_hidden(r.id, false).unwrap().is_empty());
    }
}

mod view_tests {
    use super::*;

    #[test]
    fn active_lists_started_open_leaves() {
        let db = setup_db();
        let project = add(&db, "project", TaskStatus::Projects, None);
        let step = add(&db, "step", TaskStatus::Projects, Some(project.id));
        add(&db, "inbox", TaskStatus::Inbox, None);
        let mut later = NewTask::new("later", TaskStatus::NextActions);
        later.start_date = Some(day(20));
        db.create_task(later).unwrap();
        let now = add(&db, "now", TaskStatus::NextActions, None);

        let active: Vec<TaskId> = db
            .active_tasks_on(day(10), false)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(active, vec![now.id, step.id]);

        db.set_hidden(project.id, true).unwrap();
        let visible: Vec<TaskId> = db
            .active_tasks_on(day(10), false)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(visible, vec![now.id]);
        assert_eq!(db.active_tasks_on(day(10), true).unwrap().len(), 2);
    }

    #[test]
    fn focus_orders_by_due_then_priority() {
        let db = setup_db();
        let mut soon = NewTask::new("soon", TaskStatus::NextActions);
        soon.due_date = Some(day(12));
        let soon = db.create_task(soon).unwrap();

        let mut overdue = NewTask::new("overdue", TaskStatus::NextActions);
        overdue.due_date = Some(day(1));
        let overdue = db.create_task(overdue).unwrap();

        let mut far = NewTask::new("far", TaskStatus::NextActions);
        far.due_date = Some(day(30));
        db.create_task(far).unwrap();

        let mut urgent = NewTask::new("urgent", TaskStatus::Someday);
        urgent.priority = Priority::High;
        let urgent = db.create_task(urgent).unwrap();

        let focus: Vec<TaskId> = db
            .focus_tasks_on(day(10), 3)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(focus, vec![overdue.id, soon.id, urgent.id]);
    }

    #[test]
    fn focus_accepts_out_of_range_windows() {
        let db = setup_db();
        let mut far = NewTask::new("far", TaskStatus::NextActions);
        far.due_date = Some(day(30));
        let far = db.create_task(far).unwrap();

        let wide = db.focus_tasks_on(day(10), i64::MAX).unwrap();
        assert_eq!(wide.iter().map(|t| t.id).collect::<Vec<_>>(), vec![far.id]);
        assert!(db.focus_tasks_on(day(10), i64::MIN).unwrap().is_empty());
    }

    #[test]
    fn today_requires_started_tasks() {
        let db = setup_db();
        let mut started = NewTask::new("started", TaskStatus::NextActions);
        started.start_date = Some(day(5));
        let started = db.create_task(started).unwrap();
        add(&db, "undated", TaskStatus::NextActions, None);

        let today: Vec<TaskId> = db.today_tasks_on(day(10)).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(today, vec![started.id]);
    }
}

mod bulk_and_context_tests {
    use super::*;
    use gtd_board::types::BulkUpdate;

    #[test]
    fn bulk_update_edits_selected_tasks() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::NextActions, None);
        let b = add(&db, "b", TaskStatus::NextActions, None);
        let c = add(&db, "c", TaskStatus::NextActions, None);

        let changed = db
            .bulk_update(&BulkUpdate {
                task_ids: vec![a.id, b.id, 999],
                due_date: Some(day(15)),
                priority: Some(Priority::High),
                context_to_add: Some("errands".into()),
                context_to_remove: None,
            })
            .unwrap();
        assert_eq!(changed, vec![a.id, b.id]);

        let a = get(&db, a.id);
        assert_eq!(a.due_date, Some(day(15)));
        assert_eq!(a.priority, Priority::High);
        assert_eq!(a.contexts, vec!["@errands"]);
        assert_eq!(get(&db, c.id).priority, Priority::Medium);

        db.bulk_update(&BulkUpdate {
            task_ids: vec![a.id],
            context_to_remove: Some("@errands".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(get(&db, a.id).contexts.is_empty());
    }

    #[test]
    fn contexts_listed_filtered_and_deleted() {
        let db = setup_db();
        let mut call = NewTask::new("call", TaskStatus::NextActions);
        call.contexts = vec!["@phone".into(), "@home".into()];
        let call = db.create_task(call).unwrap();
        let mut clean = NewTask::new("clean", TaskStatus::Someday);
        clean.contexts = vec!["home".into()];
        let clean = db.create_task(clean).unwrap();

        assert_eq!(db.all_contexts().unwrap(), vec!["@home", "@phone"]);
        let home: Vec<TaskId> = db.tasks_by_context("home").unwrap().iter().map(|t| t.id).collect();
        assert_eq!(home, vec![call.id, clean.id]);

        let changed = db.delete_context("home").unwrap();
        assert_eq!(changed, vec![call.id, clean.id]);
        assert_eq!(db.all_contexts().unwrap(), vec!["@phone"]);
    }
}

mod path_tests {
    use super::*;

    #[test]
    fn backfill_fills_missing_paths_once() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c = add(&db, "c", TaskStatus::Projects, Some(r.id));
        db.with_conn(|conn| {
            conn.execute("UPDATE tasks SET path = '', depth = 0", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.fill_path_depth().unwrap(), 2);
        assert_eq!(get(&db, c.id).path, format!("{:06}/{:06}", r.id, c.id));
        assert_eq!(get(&db, c.id).depth, 1);

        let snapshot = db.list_tasks().unwrap();
        assert_eq!(db.fill_path_depth().unwrap(), 0);
        assert_eq!(db.list_tasks().unwrap(), snapshot);
    }

    #[test]
    fn reindex_repairs_stale_paths_and_gaps() {
        let db = setup_db();
        let r = add(&db, "r", TaskStatus::Projects, None);
        let c = add(&db, "c", TaskStatus::Projects, Some(r.id));
        let s = add(&db, "s", TaskStatus::Projects, None);
        db.with_conn(|conn| {
            conn.execute("UPDATE tasks SET path = 'stale', depth = 7 WHERE id = ?1", [c.id])?;
            conn.execute("UPDATE tasks SET sort_order = 5 WHERE id = ?1", [s.id])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.check_integrity().unwrap().len(), 3);

        db.reindex_all().unwrap();
        assert!(db.check_integrity().unwrap().is_empty());
        assert_eq!(get(&db, s.id).sort_order, 1);
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn export_then_import_reproduces_board() {
        let source = setup_db();
        let r = add(&source, "r", TaskStatus::Projects, None);
        add(&source, "c", TaskStatus::Projects, Some(r.id));
        add(&source, "n", TaskStatus::NextActions, None);
        let json = source.export_json().unwrap();
        assert!(json.contains("\"parentId\""));

        let target = setup_db();
        add(&target, "to be replaced", TaskStatus::Inbox, None);
        assert_eq!(target.import_json(&json).unwrap(), 3);

        assert_eq!(target.list_tasks().unwrap(), source.list_tasks().unwrap());
    }

    #[test]
    fn import_recomputes_untrusted_structure() {
        let db = setup_db();
        let json = r#"{"tasks": [
            {"id": 10, "title": "root", "status": "Projects", "sortOrder": 4, "path": "junk"},
            {"id": 11, "title": "child", "status": "Projects", "parentId": 10, "sortOrder": 9, "depth": 5},
            {"id": 12, "title": "other", "status": "Projects", "sortOrder": 4}
        ]}"#;

        assert_eq!(db.import_json(json).unwrap(), 3);

        assert_eq!(get(&db, 10).path, "000010");
        assert_eq!(get(&db, 11).path, "000010/000011");
        assert_eq!(get(&db, 11).depth, 1);
        assert_eq!(get(&db, 11).sort_order, 0);
        assert_eq!(scope_ids(&db, None, TaskStatus::Projects), vec![10, 12]);
        assert_eq!(orders(&db, &[10, 12]), vec![0, 1]);
        assert!(db.check_integrity().unwrap().is_empty());

        // New ids continue after the imported ones.
        let next = add(&db, "next", TaskStatus::Inbox, None);
        assert!(next.id > 12);
    }

    #[test]
    fn empty_import_keeps_board() {
        let db = setup_db();
        add(&db, "a", TaskStatus::Inbox, None);

        assert_eq!(db.import_json(r#"{"tasks": []}"#).unwrap(), 0);
        assert_eq!(db.list_tasks().unwrap().len(), 1);
    }

    #[test]
    fn import_with_dangling_parent_rolls_back() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let json = r#"{"tasks": [{"id": 1, "title": "x", "status": "Inbox", "parentId": 50}]}"#;

        let err = db.import_json(json).unwrap_err();
        assert!(matches!(
            board_error(&err),
            BoardError::DanglingParent { parent_id: 50, .. }
        ));
        assert_eq!(db.list_tasks().unwrap(), vec![a]);
    }

    #[test]
    fn capture_and_restore_subtree() {
        let db = setup_db();
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, Some(b.id));
        let d = add(&db, "d", TaskStatus::Inbox, None);

        let captured = db.capture_subtrees(&[b.id, c.id]).unwrap();
        let captured_ids: Vec<TaskId> = captured.iter().map(|t| t.id).collect();
        assert_eq!(captured_ids, vec![b.id, c.id]);

        db.delete_tasks(&[b.id]).unwrap();
        assert_eq!(db.restore_tasks(&captured).unwrap(), 2);

        assert_eq!(scope_ids(&db, None, TaskStatus::Inbox), vec![a.id, b.id, d.id]);
        assert_eq!(get(&db, c.id).parent_id, Some(b.id));
        assert!(db.check_integrity().unwrap().is_empty());
    }

    #[test]
    fn restore_under_deleted_parent_fails() {
        let db = setup_db();
        let b = add(&db, "b", TaskStatus::Inbox, None);
        let c = add(&db, "c", TaskStatus::Inbox, Some(b.id));
        let captured = db.capture_subtrees(&[c.id]).unwrap();
        db.delete_tasks(&[b.id]).unwrap();

        let err = db.restore_tasks(&captured).unwrap_err();
        assert!(matches!(board_error(&err), BoardError::DanglingParent { .. }));
        assert!(db.list_tasks().unwrap().is_empty());
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");

        let id = {
            let db = Database::open(&path).unwrap();
            add(&db, "persisted", TaskStatus::Someday, None).id
        };

        let db = Database::open(&path).unwrap();
        let task = get(&db, id);
        assert_eq!(task.title, "persisted");
        assert_eq!(task.path, format!("{:06}", id));
    }
}

mod notification_tests {
    use super::*;
    use gtd_board::subscriptions::{ChangeNotifier, MutationKind};

    #[test]
    fn committed_mutations_publish_once() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        let db = setup_db().with_notifier(notifier);

        let a = add(&db, "a", TaskStatus::Inbox, None);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, MutationKind::TaskCreated);
        assert_eq!(event.task_ids, vec![a.id]);

        db.move_task(a.id, TaskStatus::Someday, None, 0).unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, MutationKind::TasksMoved);
        assert!(event.task_ids.contains(&a.id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn noops_and_failures_publish_nothing() {
        let notifier = ChangeNotifier::new();
        let db = setup_db().with_notifier(notifier.clone());
        let a = add(&db, "a", TaskStatus::Inbox, None);
        let mut rx = notifier.subscribe();

        db.move_task(a.id, TaskStatus::Inbox, Some(a.id), 0).unwrap();
        db.move_tasks(&MoveRequest::new(vec![], TaskStatus::Inbox, None, 0)).unwrap();
        assert!(db.toggle_completion(999).is_err());
        assert!(db.set_hidden(a.id, false).unwrap().is_empty());

        assert!(rx.try_recv().is_err());
    }
}
