// ─── Tauri Bridge ───
// Adapters from the core's presentation traits to the webview and window.

use tauri::{AppHandle, Emitter, Manager};
use tracing::{debug, info, warn};

use crate::core::events::{EventSink, HostWindow, LauncherEvent, LogClass};

pub const LOG_EVENT: &str = "log-message";
pub const PROGRESS_EVENT: &str = "download-progress";
pub const VERSION_EVENT: &str = "app-version";
pub const GAME_CLOSED_EVENT: &str = "game-closed";
const MAIN_WINDOW: &str = "main";

pub struct TauriEventSink {
    app: AppHandle,
}

impl TauriEventSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEventSink {
    fn emit(&self, event: LauncherEvent) {
        let result = match event {
            LauncherEvent::Log { class, message } => {
                let line = LauncherEvent::render_log(class, &message);
                match class {
                    LogClass::Game => debug!(target: "game", "{}", line),
                    c if c.is_error() => warn!("{}", line),
                    _ => info!("{}", line),
                }
                self.app.emit(LOG_EVENT, line)
            }
            LauncherEvent::Progress(progress) => self.app.emit(PROGRESS_EVENT, progress),
            LauncherEvent::Version(version) => self.app.emit(VERSION_EVENT, version),
            LauncherEvent::GameClosed => self.app.emit(GAME_CLOSED_EVENT, ()),
        };

        if let Err(e) = result {
            warn!("Cannot emit event to the webview: {}", e);
        }
    }
}

pub struct TauriWindow {
    app: AppHandle,
}

impl TauriWindow {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn with_main(&self, action: &str, f: impl FnOnce(&tauri::WebviewWindow) -> tauri::Result<()>) {
        match self.app.get_webview_window(MAIN_WINDOW) {
            Some(window) => {
                if let Err(e) = f(&window) {
                    warn!("Cannot {} the launcher window: {}", action, e);
                }
            }
            None => warn!("Launcher window not found"),
        }
    }
}

impl HostWindow for TauriWindow {
    fn show(&self) {
        self.with_main("show", |w| {
            w.show()?;
            w.set_focus()
        });
    }

    fn hide(&self) {
        self.with_main("hide", |w| w.hide());
    }
}
