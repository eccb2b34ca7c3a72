//! Storage-free tree algorithms over a flat task set.
//!
//! Tasks are kept in an id-keyed map; the only persisted link is `parent_id`.
//! Any operation that needs hierarchy builds a [`ChildIndex`] from the current
//! set, uses it, and drops it. Nothing here caches children across mutations.

pub mod cascade;
pub mod check;
pub mod filters;
pub mod moves;
pub mod path;

use crate::types::{Scope, Task, TaskId, TaskTree};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Owned, id-keyed working copy of the task table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSet {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskSet {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn insert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id, task)
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.remove(&id)
    }

    /// Tasks in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn into_vec(self) -> Vec<Task> {
        self.tasks.into_values().collect()
    }

    /// Build a parent→children index of the current structure.
    pub fn children_index(&self) -> ChildIndex {
        ChildIndex::build(self)
    }

    /// Members of a scope ordered by `(sort_order, id)`.
    pub fn scope_members(&self, scope: Scope) -> Vec<TaskId> {
        let mut members: Vec<&Task> = self.iter().filter(|t| t.scope() == scope).collect();
        members.sort_by_key(|t| (t.sort_order, t.id));
        members.into_iter().map(|t| t.id).collect()
    }

    /// Assign `sort_order = position` to each id in order.
    pub fn renumber(&mut self, ordered: &[TaskId]) {
        for (position, id) in ordered.iter().enumerate() {
            if let Some(task) = self.tasks.get_mut(id) {
                task.sort_order = position as i64;
            }
        }
    }

    /// Close gaps and duplicates in the given scopes, keeping relative order.
    pub fn normalize_scopes(&mut self, scopes: impl IntoIterator<Item = Scope>) {
        let scopes: BTreeSet<Scope> = scopes.into_iter().collect();
        for scope in scopes {
            let members = self.scope_members(scope);
            self.renumber(&members);
        }
    }

    /// Every distinct scope currently in use.
    pub fn scopes(&self) -> BTreeSet<Scope> {
        self.iter().map(Task::scope).collect()
    }

    /// Parent chain of `id`, nearest first. Stops at a missing parent or after
    /// `len()` steps on corrupted (cyclic) data.
    pub fn ancestors(&self, id: TaskId) -> Vec<TaskId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|t| t.parent_id);
        while let Some(parent_id) = current {
            if chain.len() >= self.len() || !self.contains(parent_id) {
                break;
            }
            chain.push(parent_id);
            current = self.get(parent_id).and_then(|t| t.parent_id);
        }
        chain
    }

    /// Tasks that differ from `before`, including ones absent from it.
    pub fn changed_from<'a>(&'a self, before: &TaskSet) -> Vec<&'a Task> {
        self.iter()
            .filter(|task| before.get(task.id) != Some(*task))
            .collect()
    }
}

/// Transient parent→children multimap. Children are ordered by
/// `(status, sort_order, id)`.
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    children: HashMap<Option<TaskId>, Vec<TaskId>>,
}

impl ChildIndex {
    fn build(set: &TaskSet) -> Self {
        let mut grouped: HashMap<Option<TaskId>, Vec<&Task>> = HashMap::new();
        for task in set.iter() {
            grouped.entry(task.parent_id).or_default().push(task);
        }
        let children = grouped
            .into_iter()
            .map(|(parent, mut kids)| {
                kids.sort_by_key(|t| (t.status, t.sort_order, t.id));
                (parent, kids.into_iter().map(|t| t.id).collect())
            })
            .collect();
        Self { children }
    }

    /// Direct children of `parent`; `None` yields top-level tasks.
    pub fn children(&self, parent: Option<TaskId>) -> &[TaskId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: TaskId) -> bool {
        !self.children(Some(id)).is_empty()
    }

    /// The seeds plus every descendant of every seed.
    pub fn closure(&self, seeds: &[TaskId]) -> HashSet<TaskId> {
        let mut affected: HashSet<TaskId> = seeds.iter().copied().collect();
        let mut queue: VecDeque<TaskId> = seeds.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            for &child in self.children(Some(id)) {
                if affected.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        affected
    }

    /// `root` and its descendants in pre-order. Each task appears once.
    pub fn subtree(&self, root: TaskId) -> Vec<TaskId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            for &child in self.children(Some(id)).iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

/// Build the display forest: top-level tasks ordered by `(status, sort_order)`
/// with children nested the same way.
pub fn build_forest(set: &TaskSet) -> Vec<TaskTree> {
    let index = set.children_index();
    let mut visited = HashSet::new();
    index
        .children(None)
        .iter()
        .filter_map(|&id| build_node(set, &index, id, &mut visited))
        .collect()
}

fn build_node(
    set: &TaskSet,
    index: &ChildIndex,
    id: TaskId,
    visited: &mut HashSet<TaskId>,
) -> Option<TaskTree> {
    if !visited.insert(id) {
        return None;
    }
    let task = set.get(id)?.clone();
    let children = index
        .children(Some(id))
        .iter()
        .filter_map(|&child| build_node(set, index, child, visited))
        .collect();
    Some(TaskTree { task, children })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::TaskSet;
    use crate::tree::path;
    use crate::types::{Task, TaskId, TaskStatus};

    /// Build a set from `(id, parent, status, sort_order)` rows and index paths.
    pub fn set_of(rows: &[(TaskId, Option<TaskId>, TaskStatus, i64)]) -> TaskSet {
        let mut set = TaskSet::new(rows.iter().map(|&(id, parent, status, order)| {
            let mut task = Task::new(id, format!("task {}", id), status).with_sort_order(order);
            task.parent_id = parent;
            task
        }));
        path::reindex_all(&mut set).expect("test data must be a forest");
        set
    }

    pub fn order_of(set: &TaskSet, id: TaskId) -> i64 {
        set.get(id).expect("task exists").sort_order
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::set_of;
    use super::*;
    use crate::types::TaskStatus::*;

    #[test]
    fn closure_includes_all_descendants() {
        let set = set_of(&[
            (1, None, Inbox, 0),
            (2, Some(1), Inbox, 0),
            (3, Some(2), Inbox, 0),
            (4, None, Inbox, 1),
        ]);
        let closure = set.children_index().closure(&[1]);
        assert_eq!(closure, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn scope_members_ordered_by_sort_order() {
        let set = set_of(&[(1, None, Inbox, 2), (2, None, Inbox, 0), (3, None, Someday, 0)]);
        assert_eq!(set.scope_members(Scope::new(None, Inbox)), vec![2, 1]);
    }

    #[test]
    fn normalize_scopes_closes_gaps() {
        let mut set = set_of(&[(1, None, Inbox, 4), (2, None, Inbox, 4), (3, None, Inbox, 9)]);
        set.normalize_scopes([Scope::new(None, Inbox)]);
        let orders: Vec<i64> = set.iter().map(|t| t.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn ancestors_stop_on_cycle() {
        let mut set = set_of(&[(1, None, Inbox, 0), (2, Some(1), Inbox, 0)]);
        set.get_mut(1).unwrap().parent_id = Some(2);
        assert!(set.ancestors(2).len() <= set.len());
    }

    #[test]
    fn forest_nests_children_in_order() {
        let set = set_of(&[
            (1, None, Projects, 0),
            (2, Some(1), Projects, 1),
            (3, Some(1), Projects, 0),
        ]);
        let forest = build_forest(&set);
        assert_eq!(forest.len(), 1);
        let child_ids: Vec<TaskId> = forest[0].children.iter().map(|c| c.task.id).collect();
        assert_eq!(child_ids, vec![3, 2]);
    }

    #[test]
    fn changed_from_reports_only_differences() {
        let before = set_of(&[(1, None, Inbox, 0), (2, None, Inbox, 1)]);
        let mut after = before.clone();
        after.get_mut(2).unwrap().sort_order = 5;
        let changed: Vec<TaskId> = after.changed_from(&before).iter().map(|t| t.id).collect();
        assert_eq!(changed, vec![2]);
    }
}
