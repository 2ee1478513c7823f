use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;

use crate::container::ContainerID;

/// Lifecycle state of a collector task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting out the grace period or opening the stats stream.
    Starting,
    /// Streaming stats.
    Running,
    /// The execution unit has exited.
    Stopped,
}

/// Status written by the task itself and read by the supervisor.
#[derive(Debug, Default)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    const STARTING: u8 = 0;
    const RUNNING: u8 = 1;
    const STOPPED: u8 = 2;

    pub(crate) fn set(&self, status: TaskStatus) {
        let raw = match status {
            TaskStatus::Starting => Self::STARTING,
            TaskStatus::Running => Self::RUNNING,
            TaskStatus::Stopped => Self::STOPPED,
        };
        self.0.store(raw, Ordering::Release);
    }

    pub(crate) fn get(&self) -> TaskStatus {
        match self.0.load(Ordering::Acquire) {
            Self::STARTING => TaskStatus::Starting,
            Self::RUNNING => TaskStatus::Running,
            _ => TaskStatus::Stopped,
        }
    }
}

/// A registered collector: its execution handle plus the generation it was registered under.
#[derive(Debug)]
pub(crate) struct TaskEntry {
    generation: u64,
    handle: JoinHandle<()>,
    status: Arc<StatusCell>,
}

impl TaskEntry {
    pub(crate) fn new(generation: u64, handle: JoinHandle<()>, status: Arc<StatusCell>) -> Self {
        Self {
            generation,
            handle,
            status,
        }
    }

    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }

    fn status(&self) -> TaskStatus {
        if self.handle.is_finished() {
            TaskStatus::Stopped
        } else {
            self.status.get()
        }
    }

    /// Forcefully terminates the task and hands back its handle for liveness polling.
    pub(crate) fn abort(self) -> JoinHandle<()> {
        self.handle.abort();
        self.handle
    }
}

/// Maps container ids to their running collector task.
///
/// Holds at most one entry per [`ContainerID`]: registration goes through the map's entry API,
/// so two concurrent registrations for the same id cannot both succeed. Only the
/// [`Supervisor`](super::Supervisor) mutates the registry.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<ContainerID, TaskEntry>,
    next_generation: AtomicU64,
}

impl TaskRegistry {
    /// Registers the task built by `spawn` unless a live task already exists for `id`.
    ///
    /// `spawn` receives the generation of the new entry and is only called when the entry is
    /// vacant or holds a finished task, which is replaced. Returns whether a task was registered.
    pub(crate) fn insert_with(
        &self,
        id: ContainerID,
        spawn: impl FnOnce(u64) -> TaskEntry,
    ) -> bool {
        match self.tasks.entry(id) {
            Entry::Occupied(entry) if entry.get().is_live() => false,
            Entry::Occupied(mut entry) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                entry.insert(spawn(generation));
                true
            }
            Entry::Vacant(entry) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                entry.insert(spawn(generation));
                true
            }
        }
    }

    pub(crate) fn remove(&self, id: &ContainerID) -> Option<TaskEntry> {
        self.tasks.remove(id).map(|(_, entry)| entry)
    }

    /// Removes the entry for `id` only if it still belongs to `generation`.
    pub(crate) fn reap(&self, id: &ContainerID, generation: u64) -> bool {
        self.tasks
            .remove_if(id, |_, entry| entry.generation == generation)
            .is_some()
    }

    pub(crate) fn drain(&self) -> Vec<(ContainerID, TaskEntry)> {
        let ids: Vec<ContainerID> = self.tasks.iter().map(|e| e.key().clone()).collect();
        ids.into_iter()
            .filter_map(|id| self.tasks.remove(&id))
            .collect()
    }

    /// Returns whether a task that has not exited yet is registered for `id`.
    pub fn is_live(&self, id: &ContainerID) -> bool {
        self.tasks.get(id).is_some_and(|entry| entry.is_live())
    }

    pub fn contains(&self, id: &ContainerID) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn status(&self, id: &ContainerID) -> Option<TaskStatus> {
        self.tasks.get(id).map(|entry| entry.status())
    }

    /// Returns the registered container ids in sorted order.
    pub fn ids(&self) -> Vec<ContainerID> {
        let mut ids: Vec<ContainerID> = self.tasks.iter().map(|e| e.key().clone()).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
