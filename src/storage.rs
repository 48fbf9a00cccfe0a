use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{is_valid_timestamp, Settings, SettingsFile, TaskCollection};

const TASKS_FILE: &str = "tasks.json";
const SETTINGS_FILE: &str = "settings.json";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("app data dir unavailable: {0}")]
    AppDataDir(String),
}

impl StorageError {
    fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}

pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    /// Loads the saved tasks. A missing file means "no prior state"; a file that
    /// does not parse is moved aside and also yields an empty collection.
    pub fn load_tasks(&self) -> TaskCollection {
        let path = self.tasks_path();
        match self.load_json::<TaskCollection>(&path) {
            Ok(tasks) => {
                let malformed = tasks
                    .iter()
                    .filter(|task| !is_valid_timestamp(&task.created_at))
                    .count();
                if malformed > 0 {
                    log::warn!("storage: {malformed} task(s) carry an unexpected time format");
                }
                log::info!("storage: loaded {} task(s) from {}", tasks.len(), path.display());
                tasks
            }
            Err(err) if err.is_not_found() => {
                log::info!("storage: no task file at {}, starting empty", path.display());
                TaskCollection::new()
            }
            Err(StorageError::Json(err)) => {
                log::warn!("storage: task file is corrupt ({err}), starting empty");
                if let Err(move_err) = self.quarantine(&path) {
                    log::warn!("storage: failed to move corrupt task file aside: {move_err}");
                }
                TaskCollection::new()
            }
            Err(err) => {
                log::warn!("storage: failed to read task file ({err}), starting empty");
                TaskCollection::new()
            }
        }
    }

    pub fn save_tasks(&self, tasks: &TaskCollection) -> Result<(), StorageError> {
        self.write_atomic(&self.tasks_path(), tasks)?;
        log::debug!("storage: saved {} task(s)", tasks.len());
        Ok(())
    }

    pub fn load_settings(&self) -> Settings {
        match self.load_json::<SettingsFile>(&self.root.join(SETTINGS_FILE)) {
            Ok(file) => file.settings,
            Err(err) if err.is_not_found() => Settings::default(),
            Err(err) => {
                log::warn!("storage: settings unreadable ({err}), using defaults");
                Settings::default()
            }
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let file = SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: settings.clone(),
        };
        self.write_atomic(&self.root.join(SETTINGS_FILE), &file)
    }

    fn load_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StorageError> {
        // Bytes, not a String: invalid UTF-8 must surface as a parse error.
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_atomic<T: Serialize>(&self, path: &Path, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }

    fn quarantine(&self, path: &Path) -> Result<PathBuf, StorageError> {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut target = self.root.join(format!("tasks.corrupt-{timestamp}.json"));
        let mut attempt = 1;
        while target.exists() {
            target = self
                .root
                .join(format!("tasks.corrupt-{timestamp}-{attempt}.json"));
            attempt += 1;
        }
        fs::rename(path, &target)?;
        log::warn!("storage: corrupt task file kept at {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CloseBehavior;

    fn make_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        (dir, storage)
    }

    fn corrupt_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("tasks.corrupt-"))
            })
            .collect()
    }

    #[test]
    fn load_missing_file_is_empty_every_time() {
        let (_dir, storage) = make_storage();
        assert!(storage.load_tasks().is_empty());
        assert!(storage.load_tasks().is_empty());
        assert!(!storage.tasks_path().exists());
    }

    #[test]
    fn save_then_load_round_trips_text_time_and_completed() {
        let (_dir, storage) = make_storage();
        let mut tasks = TaskCollection::new()
            .add("Buy milk", "2024-03-01 09:15")
            .add("Write report", "2024-03-01 10:00");
        tasks.toggle_completed(1).unwrap();

        storage.save_tasks(&tasks).unwrap();
        assert_eq!(storage.load_tasks(), tasks);
        assert!(!storage.tasks_path().with_extension("tmp").exists());
    }

    #[test]
    fn add_save_remove_save_scenario() {
        let (_dir, storage) = make_storage();
        let tasks = TaskCollection::new().add("Buy milk", "2024-03-01 09:15");
        assert_eq!(tasks.len(), 1);

        storage.save_tasks(&tasks).unwrap();
        let mut loaded = storage.load_tasks();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(0).unwrap().text, "Buy milk");
        assert_eq!(loaded.get(0).unwrap().created_at, "2024-03-01 09:15");

        loaded.remove(0).unwrap();
        assert!(loaded.is_empty());
        storage.save_tasks(&loaded).unwrap();
        assert!(storage.load_tasks().is_empty());
    }

    #[test]
    fn load_reads_files_without_completed_key() {
        let (_dir, storage) = make_storage();
        fs::write(
            storage.tasks_path(),
            r#"[
                {"task": "Buy milk", "time": "2024-03-01 09:15"},
                {"task": "Write report", "time": "2024-03-01 10:00"}
            ]"#,
        )
        .unwrap();

        let tasks = storage.load_tasks();
        assert_eq!(tasks.summary_text(), "Buy milk\nWrite report");
        assert_eq!(tasks.pending_count(), 2);
    }

    #[test]
    fn load_corrupt_file_returns_empty_and_keeps_a_copy() {
        let (dir, storage) = make_storage();
        fs::write(storage.tasks_path(), b"{ not json").unwrap();

        assert!(storage.load_tasks().is_empty());
        assert!(!storage.tasks_path().exists());
        let kept = corrupt_files(dir.path());
        assert_eq!(kept.len(), 1);
        assert_eq!(fs::read(&kept[0]).unwrap(), b"{ not json");
    }

    #[test]
    fn load_non_utf8_file_is_quarantined() {
        let (dir, storage) = make_storage();
        let original: &[u8] = b"[{\"task\": \"caf\xe9\", \"time\": \"2024-03-01 09:15\"}]";
        fs::write(storage.tasks_path(), original).unwrap();

        let loaded = storage.load_tasks();
        assert!(loaded.is_empty());
        let kept = corrupt_files(dir.path());
        assert_eq!(kept.len(), 1);

        storage
            .save_tasks(&loaded.add("new", "2024-03-01 10:00"))
            .unwrap();
        assert_eq!(fs::read(&kept[0]).unwrap(), original);
    }

    #[test]
    fn repeated_corruption_keeps_every_copy() {
        let (dir, storage) = make_storage();
        fs::write(storage.tasks_path(), b"first").unwrap();
        assert!(storage.load_tasks().is_empty());
        fs::write(storage.tasks_path(), b"second").unwrap();
        assert!(storage.load_tasks().is_empty());

        let mut contents: Vec<Vec<u8>> = corrupt_files(dir.path())
            .iter()
            .map(|path| fs::read(path).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn load_wrong_shape_is_treated_as_corrupt() {
        let (dir, storage) = make_storage();
        fs::write(storage.tasks_path(), r#"{"task": "Buy milk"}"#).unwrap();
        assert!(storage.load_tasks().is_empty());
        assert_eq!(corrupt_files(dir.path()).len(), 1);
    }

    #[test]
    fn save_failure_is_returned() {
        let (_dir, storage) = make_storage();
        // A directory where the file should be makes the final rename fail.
        fs::create_dir_all(storage.tasks_path()).unwrap();
        let tasks = TaskCollection::new().add("Buy milk", "2024-03-01 09:15");
        assert!(storage.save_tasks(&tasks).is_err());

        let missing = Storage::new(PathBuf::from("/definitely/not/here/tray-todo"));
        assert!(matches!(
            missing.save_tasks(&tasks),
            Err(StorageError::Io(_))
        ));
    }

    #[test]
    fn settings_round_trip_and_fall_back_to_defaults() {
        let (_dir, storage) = make_storage();
        assert_eq!(storage.load_settings(), Settings::default());

        let mut settings = Settings::default();
        settings.close_behavior = CloseBehavior::Exit;
        settings.language = "zh".to_string();
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings(), settings);

        fs::write(storage.root.join(SETTINGS_FILE), b"garbage").unwrap();
        assert_eq!(storage.load_settings(), Settings::default());
    }

    #[test]
    fn ensure_dirs_creates_nested_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("a").join("b"));
        storage.ensure_dirs().unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }
}
