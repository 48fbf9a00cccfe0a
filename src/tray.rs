use sys_locale::get_locale;

use crate::models::{Settings, TaskCollection};

#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::windows::show_main_window;
#[cfg(all(feature = "app", not(test)))]
use tauri::{
    menu::{Menu, MenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    App, AppHandle, Manager, Runtime,
};
#[cfg(all(feature = "app", not(test)))]
use tauri_plugin_notification::NotificationExt;

#[cfg(all(feature = "app", not(test)))]
const TRAY_ID: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayLanguage {
    Zh,
    En,
}

impl TrayLanguage {
    pub fn code(self) -> &'static str {
        match self {
            TrayLanguage::Zh => "zh",
            TrayLanguage::En => "en",
        }
    }
}

/// The three things the tray menu can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    Show,
    ListTasks,
    Quit,
}

impl TrayAction {
    pub const ALL: [TrayAction; 3] = [TrayAction::Show, TrayAction::ListTasks, TrayAction::Quit];

    pub fn menu_id(self) -> &'static str {
        match self {
            TrayAction::Show => "show",
            TrayAction::ListTasks => "list",
            TrayAction::Quit => "quit",
        }
    }

    pub fn from_menu_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.menu_id() == id)
    }
}

#[allow(dead_code)]
struct TrayLabels {
    show: &'static str,
    list_tasks: &'static str,
    quit: &'static str,
    tooltip_prefix: &'static str,
    app_title: &'static str,
    task_list_title: &'static str,
    no_tasks: &'static str,
    minimized: &'static str,
    save_failed: &'static str,
}

pub fn language_for(settings: &Settings) -> TrayLanguage {
    resolve_tray_language(&settings.language, get_locale())
}

fn resolve_tray_language(language: &str, system_locale: Option<String>) -> TrayLanguage {
    match language.trim().to_lowercase().as_str() {
        "zh" => TrayLanguage::Zh,
        "en" => TrayLanguage::En,
        _ => {
            let locale = system_locale.unwrap_or_default().to_lowercase();
            if locale.starts_with("zh") {
                TrayLanguage::Zh
            } else {
                TrayLanguage::En
            }
        }
    }
}

fn tray_labels(lang: TrayLanguage) -> TrayLabels {
    match lang {
        TrayLanguage::Zh => TrayLabels {
            show: "显示",
            list_tasks: "显示任务",
            quit: "退出",
            tooltip_prefix: "待办",
            app_title: "To-Do List",
            task_list_title: "当前任务列表",
            no_tasks: "没有任务",
            minimized: "应用已最小化到系统托盘",
            save_failed: "任务保存失败，最近的修改可能没有保存",
        },
        TrayLanguage::En => TrayLabels {
            show: "Show",
            list_tasks: "Show tasks",
            quit: "Quit",
            tooltip_prefix: "Pending",
            app_title: "To-Do List",
            task_list_title: "Current tasks",
            no_tasks: "No tasks",
            minimized: "To-Do List was minimized to the system tray",
            save_failed: "Saving tasks failed; your latest change may not have been saved",
        },
    }
}

fn action_label(labels: &TrayLabels, action: TrayAction) -> &'static str {
    match action {
        TrayAction::Show => labels.show,
        TrayAction::ListTasks => labels.list_tasks,
        TrayAction::Quit => labels.quit,
    }
}

pub fn tray_tooltip(tasks: &TaskCollection, lang: TrayLanguage) -> String {
    let labels = tray_labels(lang);
    format!("{}: {}", labels.tooltip_prefix, tasks.pending_count())
}

/// Title and body for the "show tasks" notification.
pub fn task_list_notification(tasks: &TaskCollection, lang: TrayLanguage) -> (String, String) {
    let labels = tray_labels(lang);
    (
        labels.task_list_title.to_string(),
        tasks.summary_or(labels.no_tasks),
    )
}

pub fn minimized_notification(lang: TrayLanguage) -> (String, String) {
    let labels = tray_labels(lang);
    (labels.app_title.to_string(), labels.minimized.to_string())
}

pub fn save_failed_notification(lang: TrayLanguage) -> (String, String) {
    let labels = tray_labels(lang);
    (labels.app_title.to_string(), labels.save_failed.to_string())
}

#[cfg(all(feature = "app", not(test)))]
fn build_tray_menu<R: Runtime, M: Manager<R>>(
    app: &M,
    lang: TrayLanguage,
) -> Result<Menu<R>, Box<dyn std::error::Error>> {
    let labels = tray_labels(lang);
    let show = MenuItem::with_id(
        app,
        TrayAction::Show.menu_id(),
        action_label(&labels, TrayAction::Show),
        true,
        None::<&str>,
    )?;
    let list = MenuItem::with_id(
        app,
        TrayAction::ListTasks.menu_id(),
        action_label(&labels, TrayAction::ListTasks),
        true,
        None::<&str>,
    )?;
    let quit = MenuItem::with_id(
        app,
        TrayAction::Quit.menu_id(),
        action_label(&labels, TrayAction::Quit),
        true,
        None::<&str>,
    )?;
    Ok(Menu::with_items(app, &[&show, &list, &quit])?)
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_tray(
    app: &mut App,
    tasks: &TaskCollection,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let icon = app.default_window_icon().cloned().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "default window icon is missing",
        )
    })?;

    let lang = language_for(settings);
    let menu = build_tray_menu(app, lang)?;

    let _tray = TrayIconBuilder::with_id(TRAY_ID)
        .icon(icon)
        .menu(&menu)
        .tooltip(tray_tooltip(tasks, lang))
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| {
            let id = event.id.as_ref();
            log::info!("tray: menu_event id={id}");
            match TrayAction::from_menu_id(id) {
                Some(action) => run_tray_action(app, action),
                None => log::warn!("tray: unknown menu id {id}"),
            }
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                log::info!("tray: left_click");
                show_main_window(tray.app_handle());
            }
        })
        .build(app)?;

    Ok(())
}

#[cfg(all(feature = "app", not(test)))]
fn run_tray_action<R: Runtime>(app: &AppHandle<R>, action: TrayAction) {
    match action {
        TrayAction::Show => show_main_window(app),
        TrayAction::ListTasks => {
            let state = app.state::<AppState>();
            let lang = language_for(&state.settings());
            let (title, body) = task_list_notification(&state.tasks(), lang);
            show_notification(app, &title, &body);
        }
        TrayAction::Quit => {
            log::info!("tray: quit requested");
            app.exit(0);
        }
    }
}

#[cfg(all(feature = "app", not(test)))]
pub fn update_tray<R: Runtime>(app: &AppHandle<R>, tasks: &TaskCollection, settings: &Settings) {
    let lang = language_for(settings);
    if let Some(tray) = app.tray_by_id(TRAY_ID) {
        if let Err(err) = tray.set_tooltip(Some(tray_tooltip(tasks, lang))) {
            log::warn!("tray: failed to update tooltip: {err}");
        }
        // Labels follow the language setting, so the menu is rebuilt too.
        match build_tray_menu(app, lang) {
            Ok(menu) => {
                if let Err(err) = tray.set_menu(Some(menu)) {
                    log::warn!("tray: failed to update menu: {err}");
                }
            }
            Err(err) => {
                log::warn!("tray: failed to rebuild menu: {err}");
            }
        }
    }
}

#[cfg(all(feature = "app", not(test)))]
pub fn show_notification<R: Runtime>(app: &AppHandle<R>, title: &str, body: &str) {
    if let Err(err) = app.notification().builder().title(title).body(body).show() {
        log::warn!("tray: failed to show notification: {err}");
    }
}
