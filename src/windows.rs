use tauri::{App, AppHandle, Manager, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::models::Settings;

pub const MAIN_WINDOW: &str = "main";

/// Floating task-list window: frameless and transparent, kept out of the
/// taskbar. The frontend marks its header as the drag region.
pub fn build_main_window(app: &mut App, settings: &Settings) -> tauri::Result<WebviewWindow> {
    let window = WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::App("index.html".into()))
        .title("To-Do List")
        .inner_size(400.0, 300.0)
        .min_inner_size(260.0, 180.0)
        .position(100.0, 100.0)
        .resizable(true)
        .decorations(false)
        .transparent(true)
        .skip_taskbar(true)
        .always_on_top(settings.always_on_top)
        .build()?;
    // Custom titlebar; maximizing would break the floating layout.
    if let Err(err) = window.set_maximizable(false) {
        log::warn!("windows: failed to disable maximize on main window: {err}");
    }
    Ok(window)
}

pub fn show_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        if let Err(err) = window.unminimize() {
            log::warn!("windows: failed to unminimize main window: {err}");
        }
        if let Err(err) = window.show() {
            log::warn!("windows: failed to show main window: {err}");
        }
        if let Err(err) = window.set_focus() {
            log::warn!("windows: failed to focus main window: {err}");
        }
    } else {
        log::warn!("windows: main window missing");
    }
}

pub fn hide_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        if let Err(err) = window.hide() {
            log::warn!("windows: failed to hide main window: {err}");
        }
    }
}

pub fn set_main_always_on_top<R: Runtime>(app: &AppHandle<R>, enabled: bool) -> Result<(), String> {
    let window = app
        .get_webview_window(MAIN_WINDOW)
        .ok_or_else(|| "main window missing".to_string())?;
    window.set_always_on_top(enabled).map_err(|e| e.to_string())
}
