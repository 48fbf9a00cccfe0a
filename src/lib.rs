mod commands;
mod events;
mod logging;
mod models;
mod state;
mod storage;
mod tray;
#[cfg(all(feature = "app", not(test)))]
mod windows;

#[cfg(all(feature = "app", not(test)))]
use tauri::{Manager, WindowEvent};
#[cfg(all(feature = "app", not(test)))]
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut};

#[cfg(all(feature = "app", not(test)))]
use crate::commands::*;
#[cfg(all(feature = "app", not(test)))]
use crate::logging::init_logging;
#[cfg(all(feature = "app", not(test)))]
use crate::models::CloseBehavior;
#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::storage::Storage;
#[cfg(all(feature = "app", not(test)))]
use crate::tray::{init_tray, language_for, minimized_notification, show_notification};
#[cfg(all(feature = "app", not(test)))]
use crate::windows::{build_main_window, hide_main_window, show_main_window, MAIN_WINDOW};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
#[cfg(all(feature = "app", not(test)))]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, _shortcut, event| {
                    if event.state() == tauri_plugin_global_shortcut::ShortcutState::Pressed {
                        show_main_window(app);
                    }
                })
                .build(),
        )
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            if let Err(err) = init_logging(&data_dir) {
                eprintln!("failed to initialize logging: {err}");
            }

            let storage = Storage::new(data_dir);
            storage.ensure_dirs()?;
            let state = AppState::from_storage(&storage);
            app.manage(state.clone());

            let settings = state.settings();
            build_main_window(app, &settings)?;
            init_tray(app, &state.tasks(), &settings)?;

            match settings.shortcut.parse::<Shortcut>() {
                Ok(shortcut) => {
                    if let Err(err) = app.handle().global_shortcut().register(shortcut) {
                        log::warn!("setup: failed to register shortcut: {err}");
                    }
                }
                Err(err) => log::warn!("setup: invalid shortcut {:?}: {err}", settings.shortcut),
            }

            log::info!("setup: started with {} task(s)", state.tasks().len());
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::CloseRequested { api, .. } = event {
                if window.label() != MAIN_WINDOW {
                    return;
                }
                let app = window.app_handle();
                let settings = app.state::<AppState>().settings();
                match settings.close_behavior {
                    CloseBehavior::Exit => {
                        log::info!("window: close requested, exiting");
                        app.exit(0);
                    }
                    CloseBehavior::HideToTray => {
                        api.prevent_close();
                        hide_main_window(app);
                        let (title, body) = minimized_notification(language_for(&settings));
                        show_notification(app, &title, &body);
                    }
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            load_state,
            add_task,
            toggle_task,
            delete_task,
            update_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
