use crate::models::{Settings, TaskCollection};
use crate::tray::language_for;

pub const EVENT_STATE_UPDATED: &str = "state_updated";

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatePayload {
    pub tasks: TaskCollection,
    pub settings: Settings,
    /// `zh` or `en`; `auto` already resolved against the system locale so the
    /// window uses the same language as the tray.
    pub language: &'static str,
}

impl StatePayload {
    pub fn new(tasks: TaskCollection, settings: Settings) -> Self {
        let language = language_for(&settings).code();
        Self {
            tasks,
            settings,
            language,
        }
    }
}
