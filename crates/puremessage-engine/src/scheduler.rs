use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

/// Identifies a delayed task. Each key holds at most one pending task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKey {
    /// Task owned by a message as a whole (timed counters)
    Message { message: String },
    /// Task owned by a message on behalf of one player (join delays)
    Player { message: String, player: String },
}

impl TaskKey {
    pub fn message(message: impl Into<String>) -> Self {
        TaskKey::Message {
            message: message.into(),
        }
    }

    pub fn player(message: impl Into<String>, player: impl Into<String>) -> Self {
        TaskKey::Player {
            message: message.into(),
            player: player.into(),
        }
    }

    /// Name of the message that owns the task
    pub fn message_name(&self) -> &str {
        match self {
            TaskKey::Message { message } | TaskKey::Player { message, .. } => message,
        }
    }

    /// Player the task was scheduled for, if any
    pub fn player_name(&self) -> Option<&str> {
        match self {
            TaskKey::Message { .. } => None,
            TaskKey::Player { player, .. } => Some(player),
        }
    }

    /// Same task, owned by a message with a different name
    pub fn renamed(&self, new_name: &str) -> Self {
        match self {
            TaskKey::Message { .. } => TaskKey::message(new_name),
            TaskKey::Player { player, .. } => TaskKey::player(new_name, player.clone()),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::Message { message } => write!(f, "{}", message),
            TaskKey::Player { message, player } => write!(f, "{} ({})", message, player),
        }
    }
}

/// Unique identifier of one scheduling of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// A task that has come due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub handle: TaskHandle,
    pub key: TaskKey,
    pub scheduled_at: Instant,
    pub due: Instant,
}

#[derive(Debug, Clone)]
struct Task {
    handle: TaskHandle,
    scheduled_at: Instant,
    due: Instant,
}

/// One-shot delayed tasks keyed by [`TaskKey`]
///
/// Nothing runs on its own: the owner calls [`TaskScheduler::tick`] and
/// delivers whatever came due. Cancelling is immediate, so a cancelled task
/// can never be returned by a later tick.
#[derive(Debug, Default)]
pub struct TaskScheduler {
    tasks: HashMap<TaskKey, Task>,
    next_id: u64,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` to come due `delay` after `now`. An existing task with
    /// the same key is replaced.
    pub fn schedule(&mut self, key: TaskKey, delay: Duration, now: Instant) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;

        debug!(target: "scheduler", "Scheduling {} in {:?}", key, delay);

        let task = Task {
            handle,
            scheduled_at: now,
            due: now + delay,
        };
        if self.tasks.insert(key.clone(), task).is_some() {
            debug!(target: "scheduler", "Replaced pending task {}", key);
        }
        handle
    }

    /// Cancel a pending task
    pub fn cancel(&mut self, key: &TaskKey) -> bool {
        let removed = self.tasks.remove(key).is_some();
        if removed {
            debug!(target: "scheduler", "Cancelled {}", key);
        }
        removed
    }

    /// Cancel every pending task owned by a message, returning how many were removed
    pub fn cancel_message(&mut self, message: &str) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|key, _| key.message_name() != message);
        before - self.tasks.len()
    }

    pub fn is_scheduled(&self, key: &TaskKey) -> bool {
        self.tasks.contains_key(key)
    }

    /// Time left before `key` comes due, zero if it is already overdue
    pub fn remaining(&self, key: &TaskKey, now: Instant) -> Option<Duration> {
        self.tasks
            .get(key)
            .map(|task| task.due.saturating_duration_since(now))
    }

    /// Earliest due time of any pending task
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.values().map(|task| task.due).min()
    }

    /// Remove and return every task due at `now`, earliest first
    pub fn tick(&mut self, now: Instant) -> Vec<ScheduledTask> {
        let due_keys: Vec<TaskKey> = self
            .tasks
            .iter()
            .filter(|(_, task)| now >= task.due)
            .map(|(key, _)| key.clone())
            .collect();

        let mut fired: Vec<ScheduledTask> = due_keys
            .into_iter()
            .filter_map(|key| {
                self.tasks.remove(&key).map(|task| ScheduledTask {
                    handle: task.handle,
                    key,
                    scheduled_at: task.scheduled_at,
                    due: task.due,
                })
            })
            .collect();

        fired.sort_by(|a, b| a.due.cmp(&b.due).then(a.handle.cmp(&b.handle)));
        fired
    }

    /// Number of pending tasks
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}
