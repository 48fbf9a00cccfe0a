use std::path::PathBuf;

use crate::events::StatePayload;
#[cfg(all(feature = "app", not(test)))]
use crate::events::EVENT_STATE_UPDATED;
#[cfg(all(feature = "app", not(test)))]
use crate::models::timestamp_now;
use crate::models::{Settings, TaskCollection};
use crate::state::AppState;
use crate::storage::{Storage, StorageError};
use crate::tray::{language_for, save_failed_notification};

#[cfg(all(feature = "app", not(test)))]
use crate::tray::{show_notification, update_tray};
#[cfg(all(feature = "app", not(test)))]
use crate::windows::set_main_always_on_top;
#[cfg(all(feature = "app", not(test)))]
use tauri::{AppHandle, Emitter, Manager, Runtime, State};
#[cfg(all(feature = "app", not(test)))]
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Everything a command needs from the desktop runtime. Tests swap in a
/// recording implementation so the handlers run without a window.
trait CommandCtx {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_state_updated(&self, payload: StatePayload);
    fn update_tray(&self, tasks: &TaskCollection, settings: &Settings);
    fn notify(&self, title: &str, body: &str);
    fn set_always_on_top(&self, enabled: bool) -> Result<(), String>;
    fn shortcut_unregister_all(&self);
    fn shortcut_validate(&self, shortcut: &str) -> Result<(), String>;
    fn shortcut_register(&self, shortcut: &str) -> Result<(), String>;
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn open_storage(ctx: &impl CommandCtx) -> Result<Storage, StorageError> {
    let storage = Storage::new(ctx.app_data_dir()?);
    storage.ensure_dirs()?;
    Ok(storage)
}

fn persist_tasks(ctx: &impl CommandCtx, tasks: &TaskCollection) -> Result<(), StorageError> {
    open_storage(ctx)?.save_tasks(tasks)
}

fn persist_settings(ctx: &impl CommandCtx, settings: &Settings) -> Result<(), StorageError> {
    open_storage(ctx)?.save_settings(settings)
}

fn refresh_views(ctx: &impl CommandCtx, state: &AppState) {
    let tasks = state.tasks();
    let settings = state.settings();
    ctx.update_tray(&tasks, &settings);
    ctx.emit_state_updated(StatePayload::new(tasks, settings));
}

/// Saves after a mutation and refreshes the window and tray either way. A failed
/// save keeps the in-memory change and tells the user it may be lost.
fn save_and_refresh(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<TaskCollection> {
    let tasks = state.tasks();
    let saved = persist_tasks(ctx, &tasks);
    refresh_views(ctx, state);
    match saved {
        Ok(()) => ok(tasks),
        Err(error) => {
            log::error!("commands: failed to save {} task(s): {error}", tasks.len());
            let (title, body) = save_failed_notification(language_for(&state.settings()));
            ctx.notify(&title, &body);
            err(&format!("storage error: {error}"))
        }
    }
}

fn load_state_impl(state: &AppState) -> CommandResult<StatePayload> {
    ok(StatePayload::new(state.tasks(), state.settings()))
}

fn add_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    text: &str,
    created_at: &str,
) -> CommandResult<TaskCollection> {
    if !state.add_task(text, created_at) {
        log::debug!("commands: ignoring blank task text");
        return ok(state.tasks());
    }
    log::info!("commands: added task at {created_at}");
    save_and_refresh(ctx, state)
}

fn toggle_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    index: usize,
) -> CommandResult<TaskCollection> {
    match state.toggle_task(index) {
        Ok(completed) => {
            log::info!("commands: task {index} completed={completed}");
            save_and_refresh(ctx, state)
        }
        Err(error) => {
            log::warn!("commands: toggle rejected: {error}");
            err(&error.to_string())
        }
    }
}

fn delete_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    index: usize,
) -> CommandResult<TaskCollection> {
    match state.remove_task(index) {
        Ok(_) => {
            log::info!("commands: deleted task {index}");
            save_and_refresh(ctx, state)
        }
        Err(error) => {
            log::warn!("commands: delete rejected: {error}");
            err(&error.to_string())
        }
    }
}

fn update_settings_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    mut settings: Settings,
) -> CommandResult<Settings> {
    let previous = state.settings();
    let previous_shortcut = previous.shortcut.trim().to_string();
    let next_shortcut = settings.shortcut.trim().to_string();
    let next_language = settings.language.trim().to_lowercase();

    settings.shortcut = next_shortcut.clone();
    settings.language = match next_language.as_str() {
        "auto" | "zh" | "en" => next_language,
        _ => Settings::default().language,
    };

    // Validate and register before persisting, restoring the old shortcut on
    // failure so the window stays reachable from the keyboard.
    let mut shortcut_changed = false;
    if previous_shortcut != next_shortcut {
        shortcut_changed = true;
        if let Err(parse_err) = ctx.shortcut_validate(&next_shortcut) {
            return err(&format!("invalid shortcut: {parse_err}"));
        }

        ctx.shortcut_unregister_all();
        if let Err(register_err) = ctx.shortcut_register(&next_shortcut) {
            let _ = ctx.shortcut_register(&previous_shortcut);
            return err(&format!("failed to register shortcut: {register_err}"));
        }
    }

    if previous.always_on_top != settings.always_on_top {
        if let Err(error) = ctx.set_always_on_top(settings.always_on_top) {
            log::warn!("commands: failed to apply always_on_top: {error}");
        }
    }

    state.update_settings(settings.clone());
    if let Err(error) = persist_settings(ctx, &settings) {
        log::error!("commands: failed to save settings: {error}");
        state.update_settings(previous.clone());
        if shortcut_changed {
            ctx.shortcut_unregister_all();
            let _ = ctx.shortcut_register(&previous_shortcut);
        }
        if previous.always_on_top != settings.always_on_top {
            let _ = ctx.set_always_on_top(previous.always_on_top);
        }
        return err(&format!("storage error: {error}"));
    }

    refresh_views(ctx, state);
    ok(settings)
}

#[cfg(all(feature = "app", not(test)))]
struct TauriCommandCtx<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> CommandCtx for TauriCommandCtx<'_, R> {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError> {
        self.app
            .path()
            .app_data_dir()
            .map_err(|err| StorageError::AppDataDir(err.to_string()))
    }

    fn emit_state_updated(&self, payload: StatePayload) {
        if let Err(err) = self.app.emit(EVENT_STATE_UPDATED, payload) {
            log::warn!("commands: failed to emit state update: {err}");
        }
    }

    fn update_tray(&self, tasks: &TaskCollection, settings: &Settings) {
        update_tray(self.app, tasks, settings);
    }

    fn notify(&self, title: &str, body: &str) {
        show_notification(self.app, title, body);
    }

    fn set_always_on_top(&self, enabled: bool) -> Result<(), String> {
        set_main_always_on_top(self.app, enabled)
    }

    fn shortcut_unregister_all(&self) {
        let _ = self.app.global_shortcut().unregister_all();
    }

    fn shortcut_validate(&self, shortcut: &str) -> Result<(), String> {
        let shortcut = shortcut.trim();
        if shortcut.is_empty() {
            return Err("empty shortcut".to_string());
        }
        shortcut
            .parse::<Shortcut>()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn shortcut_register(&self, shortcut: &str) -> Result<(), String> {
        let shortcut = shortcut.trim();
        if shortcut.is_empty() {
            return Err("empty shortcut".to_string());
        }
        let parsed = shortcut.parse::<Shortcut>().map_err(|e| e.to_string())?;
        self.app
            .global_shortcut()
            .register(parsed)
            .map_err(|e| e.to_string())
    }
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn load_state(state: State<AppState>) -> CommandResult<StatePayload> {
    load_state_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn add_task(
    app: AppHandle,
    state: State<AppState>,
    text: String,
) -> CommandResult<TaskCollection> {
    let ctx = TauriCommandCtx { app: &app };
    add_task_impl(&ctx, state.inner(), &text, &timestamp_now())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn toggle_task(
    app: AppHandle,
    state: State<AppState>,
    index: usize,
) -> CommandResult<TaskCollection> {
    let ctx = TauriCommandCtx { app: &app };
    toggle_task_impl(&ctx, state.inner(), index)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn delete_task(
    app: AppHandle,
    state: State<AppState>,
    index: usize,
) -> CommandResult<TaskCollection> {
    let ctx = TauriCommandCtx { app: &app };
    delete_task_impl(&ctx, state.inner(), index)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn update_settings(
    app: AppHandle,
    state: State<AppState>,
    settings: Settings,
) -> CommandResult<Settings> {
    let ctx = TauriCommandCtx { app: &app };
    update_settings_impl(&ctx, state.inner(), settings)
}
