mod bridge;
mod commands;
mod core;

use std::sync::Arc;

use tauri::webview::PageLoadEvent;
use tauri::Manager;
use tracing_subscriber::EnvFilter;

use crate::bridge::{TauriEventSink, TauriWindow};
use crate::core::events::{EventSink, LauncherEvent};
use crate::core::state::{AppState, LauncherPaths};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,arcend_launcher_lib=debug")),
        )
        .init();

    tracing::info!("Arcend launcher starting...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let handle = app.handle().clone();
            let resource_dir = handle.path().resource_dir().ok();
            let paths = LauncherPaths::resolve(resource_dir.as_deref());
            let state = AppState::new(
                paths,
                Arc::new(TauriEventSink::new(handle.clone())),
                Arc::new(TauriWindow::new(handle)),
            )?;
            app.manage(state);
            Ok(())
        })
        .on_page_load(|webview, payload| {
            if !matches!(payload.event(), PageLoadEvent::Finished) {
                return;
            }
            if let Some(state) = webview.try_state::<AppState>() {
                state.events.emit(LauncherEvent::Version(
                    env!("CARGO_PKG_VERSION").to_string(),
                ));
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_config,
            commands::set_ram,
            commands::set_console_visible,
            commands::check_auth,
            commands::login,
            commands::logout,
            commands::request_logout,
            commands::cancel_logout,
            commands::get_auth_state,
            commands::launch_game,
            commands::cancel_launch,
            commands::open_folder,
            commands::get_memory_limits,
            commands::minimize_window,
            commands::close_window,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
