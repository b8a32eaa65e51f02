use crate::adapter::RequestHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress of one request, shared between its task and its response sink
#[derive(Debug, Default)]
pub(crate) struct TaskState {
    finished: AtomicBool,
    cancelled: AtomicBool,
}

impl TaskState {
    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One in-flight request: the adapter's handle and the state shared with
/// its response sink
pub(crate) struct Task {
    url: String,
    handle: Box<dyn RequestHandle>,
    state: Arc<TaskState>,
}

impl Task {
    pub(crate) fn new(
        url: String,
        handle: Box<dyn RequestHandle>,
        state: Arc<TaskState>,
    ) -> Self {
        Self { url, handle, state }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn is_bound_to(&self, state: &Arc<TaskState>) -> bool {
        Arc::ptr_eq(&self.state, state)
    }

    pub(crate) fn cancel(self) {
        self.handle.cancel();
    }
}

/// Pending tasks keyed by request id.
///
/// Every operation holds the lock only for the map access itself; handles
/// are cancelled and dropped by the caller after the lock is released.
#[derive(Default)]
pub(crate) struct Registry {
    tasks: Mutex<HashMap<String, Task>>,
}

impl Registry {
    /// Returns the task previously stored under `id`, if any
    pub(crate) fn insert(&self, id: String, task: Task) -> Option<Task> {
        self.tasks.lock().insert(id, task)
    }

    pub(crate) fn take(&self, id: &str) -> Option<Task> {
        self.tasks.lock().remove(id)
    }

    /// Remove the task under `id` only when `predicate` accepts it
    pub(crate) fn take_if(
        &self,
        id: &str,
        predicate: impl FnOnce(&Task) -> bool,
    ) -> Option<Task> {
        let mut tasks = self.tasks.lock();
        if tasks.get(id).is_some_and(predicate) {
            tasks.remove(id)
        } else {
            None
        }
    }

    /// Remove the task under `id` for cancellation. The task is marked
    /// cancelled before it leaves the map, so anyone who finds it missing
    /// afterwards also sees the mark.
    pub(crate) fn take_cancelled(&self, id: &str) -> Option<Task> {
        let mut tasks = self.tasks.lock();
        let task = tasks.remove(id)?;
        task.state.cancelled.store(true, Ordering::SeqCst);
        Some(task)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.tasks.lock().contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Remove every task, marking each cancelled
    pub(crate) fn drain_cancelled(&self) -> Vec<(String, Task)> {
        let mut tasks = self.tasks.lock();
        for task in tasks.values() {
            task.state.cancelled.store(true, Ordering::SeqCst);
        }
        tasks.drain().collect()
    }
}
