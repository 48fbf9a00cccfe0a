use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// chrono rendering of `yyyy-MM-dd hh:mm` (24-hour clock).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Returned by [`TaskCollection::summary_text`] when there is nothing to list.
pub const EMPTY_SUMMARY: &str = "No tasks";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(rename = "task")]
    pub text: String,
    #[serde(rename = "time")]
    pub created_at: String,
    // Older files only carry `task` and `time`.
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(text: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: created_at.into(),
            completed: false,
        }
    }
}

/// Ordered list of tasks. Position is the only identity a task has, and the
/// order is the display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TaskCollection {
    tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    /// Appends a new, uncompleted task. Blank text leaves the collection as is.
    pub fn add(mut self, text: &str, created_at: &str) -> Self {
        if text.trim().is_empty() {
            return self;
        }
        self.tasks.push(Task::new(text, created_at));
        self
    }

    pub fn remove(&mut self, index: usize) -> Result<Task, TaskError> {
        self.check_index(index)?;
        Ok(self.tasks.remove(index))
    }

    /// Flips the completed flag of one task and returns its new value.
    pub fn toggle_completed(&mut self, index: usize) -> Result<bool, TaskError> {
        self.check_index(index)?;
        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn summary_text(&self) -> String {
        self.summary_or(EMPTY_SUMMARY)
    }

    pub fn summary_or(&self, placeholder: &str) -> String {
        if self.tasks.is_empty() {
            return placeholder.to_string();
        }
        self.tasks
            .iter()
            .map(|task| task.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }

    fn check_index(&self, index: usize) -> Result<(), TaskError> {
        if index >= self.tasks.len() {
            return Err(TaskError::OutOfRange {
                index,
                len: self.tasks.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<Task>> for TaskCollection {
    fn from(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

impl<'a> IntoIterator for &'a TaskCollection {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn timestamp_now() -> String {
    format_timestamp(Local::now())
}

pub fn is_valid_timestamp(value: &str) -> bool {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloseBehavior {
    HideToTray,
    Exit,
}

impl Default for CloseBehavior {
    fn default() -> Self {
        Self::HideToTray
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub close_behavior: CloseBehavior,
    #[serde(default = "default_always_on_top")]
    pub always_on_top: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_shortcut")]
    pub shortcut: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            close_behavior: CloseBehavior::HideToTray,
            always_on_top: default_always_on_top(),
            language: default_language(),
            shortcut: default_shortcut(),
        }
    }
}

fn default_always_on_top() -> bool {
    true
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_shortcut() -> String {
    "CommandOrControl+Shift+T".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn two_tasks() -> TaskCollection {
        TaskCollection::new()
            .add("Buy milk", "2024-03-01 09:15")
            .add("Write report", "2024-03-01 10:00")
    }

    #[test]
    fn add_appends_uncompleted_task_in_order() {
        let tasks = two_tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.get(0).unwrap().text, "Buy milk");
        assert_eq!(tasks.get(1).unwrap().created_at, "2024-03-01 10:00");
        assert!(tasks.iter().all(|task| !task.completed));
    }

    #[test]
    fn add_ignores_blank_text() {
        let before = two_tasks();
        let after = before.clone().add("   \t\n", "2024-03-01 11:00");
        assert_eq!(after, before);
        assert_eq!(before.clone().add("", "2024-03-01 11:00"), before);
    }

    #[test]
    fn remove_in_range_keeps_relative_order() {
        let mut tasks = two_tasks().add("Call mom", "2024-03-01 12:00");
        let removed = tasks.remove(1).expect("index 1 exists");
        assert_eq!(removed.text, "Write report");
        let texts: Vec<_> = tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Buy milk", "Call mom"]);
    }

    #[test]
    fn remove_out_of_range_leaves_collection_unchanged() {
        let mut tasks = two_tasks();
        let before = tasks.clone();
        assert_eq!(
            tasks.remove(2),
            Err(TaskError::OutOfRange { index: 2, len: 2 })
        );
        assert_eq!(tasks, before);

        let mut empty = TaskCollection::new();
        assert!(empty.remove(0).is_err());
    }

    #[test]
    fn toggle_flips_exactly_one_task() {
        let mut tasks = two_tasks();
        assert_eq!(tasks.toggle_completed(1), Ok(true));
        assert!(!tasks.get(0).unwrap().completed);
        assert!(tasks.get(1).unwrap().completed);
        assert_eq!(tasks.get(1).unwrap().text, "Write report");

        assert_eq!(tasks.toggle_completed(1), Ok(false));
        assert_eq!(tasks, two_tasks());

        assert_eq!(
            tasks.toggle_completed(5),
            Err(TaskError::OutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn summary_text_uses_placeholder_or_joins_in_order() {
        assert_eq!(TaskCollection::new().summary_text(), EMPTY_SUMMARY);
        assert_eq!(TaskCollection::new().summary_or("nothing"), "nothing");
        assert_eq!(two_tasks().summary_text(), "Buy milk\nWrite report");
    }

    #[test]
    fn pending_count_skips_completed_tasks() {
        let mut tasks = two_tasks();
        assert_eq!(tasks.pending_count(), 2);
        tasks.toggle_completed(0).unwrap();
        assert_eq!(tasks.pending_count(), 1);
    }

    #[test]
    fn collection_serializes_as_plain_array_with_task_and_time_keys() {
        let mut tasks = two_tasks();
        tasks.toggle_completed(1).unwrap();
        let value = serde_json::to_value(&tasks).expect("serialize tasks");
        assert_eq!(
            value,
            serde_json::json!([
                { "task": "Buy milk", "time": "2024-03-01 09:15", "completed": false },
                { "task": "Write report", "time": "2024-03-01 10:00", "completed": true }
            ])
        );
    }

    #[test]
    fn task_without_completed_key_defaults_to_false() {
        let json = r#"[{"task": "Buy milk", "time": "2024-03-01 09:15"}]"#;
        let tasks: TaskCollection = serde_json::from_str(json).expect("legacy file should parse");
        assert_eq!(tasks.len(), 1);
        assert!(!tasks.get(0).unwrap().completed);
    }

    #[test]
    fn timestamps_use_minute_precision_24h_clock() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 21, 5, 59).unwrap();
        assert_eq!(format_timestamp(at), "2024-03-01 21:05");
        assert!(is_valid_timestamp("2024-03-01 09:15"));
        assert!(!is_valid_timestamp("2024-03-01"));
        assert!(is_valid_timestamp(&timestamp_now()));
    }

    #[test]
    fn settings_serde_applies_defaults_for_missing_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{ "close_behavior": "exit" }"#).expect("settings parse");
        assert_eq!(settings.close_behavior, CloseBehavior::Exit);
        assert!(settings.always_on_top);
        assert_eq!(settings.language, "auto");
        assert_eq!(settings.shortcut, "CommandOrControl+Shift+T");

        let empty: Settings = serde_json::from_str("{}").expect("empty settings parse");
        assert_eq!(empty, Settings::default());
    }
}
