//! Change notification for board mutations.
//!
//! The database publishes one [`ChangeEvent`] after every committed mutation.
//! Views that cache board state subscribe and re-read when something they
//! display has changed. Nothing is published for no-ops or rolled-back work.

use crate::types::TaskId;
use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per receiver before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Categories of committed mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Tasks were created.
    TaskCreated,
    /// Plain fields (title, dates, contexts, flags) were edited.
    TaskUpdated,
    /// Tasks were reparented, restatused or reordered.
    TasksMoved,
    /// Completion was toggled, possibly cascading.
    CompletionChanged,
    /// The hidden flag changed on a subtree.
    VisibilityChanged,
    /// Tasks were deleted.
    TasksDeleted,
    /// The whole board was replaced or reindexed.
    BoardReplaced,
}

/// One committed mutation and the tasks it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: MutationKind,
    pub task_ids: Vec<TaskId>,
}

/// Fan-out channel of [`ChangeEvent`]s.
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new receiver. It sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send `event` to every receiver. Returns how many received it; having
    /// no receivers is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
