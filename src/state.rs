use std::sync::{Arc, Mutex};

use crate::models::{Settings, Task, TaskCollection, TaskError};
use crate::storage::Storage;

/// Shared handle to the running app's tasks and settings. The window commands
/// and the tray callbacks may run on different threads, so every access goes
/// through the lock.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(tasks: TaskCollection, settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData { tasks, settings })),
        }
    }

    /// Startup load: whatever is on disk, or empty tasks and default settings.
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(storage.load_tasks(), storage.load_settings())
    }

    pub fn tasks(&self) -> TaskCollection {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.clone()
    }

    /// Returns `false` when the text was blank and nothing was added.
    pub fn add_task(&self, text: &str, created_at: &str) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let before = guard.tasks.len();
        let tasks = std::mem::take(&mut guard.tasks);
        guard.tasks = tasks.add(text, created_at);
        guard.tasks.len() > before
    }

    pub fn remove_task(&self, index: usize) -> Result<Task, TaskError> {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.remove(index)
    }

    pub fn toggle_task(&self, index: usize) -> Result<bool, TaskError> {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.toggle_completed(index)
    }

    pub fn settings(&self) -> Settings {
        let guard = self.inner.lock().expect("state poisoned");
        guard.settings.clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.settings = settings;
    }
}

#[derive(Debug)]
struct AppData {
    tasks: TaskCollection,
    settings: Settings,
}
