use serde::{Deserialize, Serialize};
use sysinfo::System;
use tauri_plugin_opener::OpenerExt;
use tracing::{debug, info, warn};

use crate::core::auth::{AuthState, SessionIdentity};
use crate::core::config::Config;
use crate::core::error::LauncherError;
use crate::core::events::{EventSink, LauncherEvent, LogClass};
use crate::core::launch::MIN_MEMORY_GB;
use crate::core::state::AppState;

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Settings the webview may see. The saved session never leaves the backend.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub ram: u32,
    pub version: String,
    #[serde(rename = "showConsole")]
    pub show_console: bool,
}

impl From<Config> for ConfigView {
    fn from(config: Config) -> Self {
        Self {
            ram: config.ram_allocation_gb,
            version: config.installed_content_version,
            show_console: config.console_visible_by_default,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub state: AuthState,
    pub identity: Option<SessionIdentity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryLimits {
    pub min_gb: u32,
    pub max_gb: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Game,
    Launcher,
}

fn memory_limits(total_bytes: u64) -> MemoryLimits {
    let total_gb = u32::try_from(total_bytes / BYTES_PER_GB).unwrap_or(u32::MAX);
    MemoryLimits {
        min_gb: MIN_MEMORY_GB,
        max_gb: total_gb.max(MIN_MEMORY_GB),
    }
}

fn console(state: &AppState, class: LogClass, message: impl Into<String>) {
    state.events.emit(LauncherEvent::log(class, message));
}

#[tauri::command]
pub async fn get_config(state: tauri::State<'_, AppState>) -> Result<ConfigView, LauncherError> {
    Ok(state.config.load().await.into())
}

#[tauri::command]
pub async fn set_ram(
    state: tauri::State<'_, AppState>,
    value: u32,
) -> Result<ConfigView, LauncherError> {
    if value == 0 {
        console(&state, LogClass::Config, "RAM must be at least 1 GB.");
        return Err(LauncherError::Other("RAM allocation must be positive".into()));
    }

    let config = state
        .config
        .update(move |mut config| {
            config.ram_allocation_gb = value;
            config
        })
        .await?;
    console(&state, LogClass::Config, format!("RAM updated: {value} GB"));
    Ok(config.into())
}

#[tauri::command]
pub async fn set_console_visible(
    state: tauri::State<'_, AppState>,
    visible: bool,
) -> Result<ConfigView, LauncherError> {
    let config = state
        .config
        .update(move |mut config| {
            config.console_visible_by_default = visible;
            config
        })
        .await?;
    debug!("Console visible by default: {}", visible);
    Ok(config.into())
}

#[tauri::command]
pub async fn check_auth(
    state: tauri::State<'_, AppState>,
) -> Result<Option<SessionIdentity>, LauncherError> {
    state.auth.check_session().await
}

#[tauri::command]
pub async fn login(
    state: tauri::State<'_, AppState>,
) -> Result<Option<SessionIdentity>, LauncherError> {
    let identity = state.auth.login().await?;
    if let Some(identity) = &identity {
        console(&state, LogClass::Info, format!("Signed in as {}", identity.name));
    }
    Ok(identity)
}

#[tauri::command]
pub async fn logout(state: tauri::State<'_, AppState>) -> Result<AuthState, LauncherError> {
    state.auth.logout().await?;
    Ok(state.auth.state())
}

#[tauri::command]
pub async fn request_logout(
    state: tauri::State<'_, AppState>,
) -> Result<AuthState, LauncherError> {
    state.auth.request_logout().await
}

#[tauri::command]
pub async fn cancel_logout(state: tauri::State<'_, AppState>) -> Result<AuthState, LauncherError> {
    Ok(state.auth.cancel_logout())
}

#[tauri::command]
pub async fn get_auth_state(state: tauri::State<'_, AppState>) -> Result<AuthStatus, LauncherError> {
    Ok(AuthStatus {
        state: state.auth.state(),
        identity: state.auth.identity(),
    })
}

/// Fire-and-forget: progress, logs and `game-closed` arrive as events.
#[tauri::command]
pub async fn launch_game(state: tauri::State<'_, AppState>) -> Result<(), LauncherError> {
    let orchestrator = state.orchestrator.clone();
    tauri::async_runtime::spawn(async move {
        let outcome = orchestrator.launch().await;
        info!("Launch attempt finished: {:?}", outcome);
    });
    Ok(())
}

#[tauri::command]
pub async fn cancel_launch(state: tauri::State<'_, AppState>) -> Result<(), LauncherError> {
    state.orchestrator.cancel_launch();
    Ok(())
}

#[tauri::command]
pub async fn open_folder(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppState>,
    kind: FolderKind,
) -> Result<(), LauncherError> {
    let folder = match kind {
        FolderKind::Game => state.paths.game_dir.clone(),
        FolderKind::Launcher => state.paths.launcher_dir.clone(),
    };

    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|e| LauncherError::io(&folder, e))?;

    app.opener()
        .open_path(folder.to_string_lossy(), None::<&str>)
        .map_err(|e| {
            warn!("Cannot open {:?}: {}", folder, e);
            LauncherError::Other(format!("Cannot open {}: {}", folder.display(), e))
        })
}

#[tauri::command]
pub async fn get_memory_limits() -> Result<MemoryLimits, LauncherError> {
    let total = tauri::async_runtime::spawn_blocking(|| {
        let mut system = System::new();
        system.refresh_memory();
        system.total_memory()
    })
    .await
    .map_err(|e| LauncherError::Other(e.to_string()))?;

    Ok(memory_limits(total))
}

#[tauri::command]
pub async fn minimize_window(window: tauri::WebviewWindow) -> Result<(), LauncherError> {
    window
        .minimize()
        .map_err(|e| LauncherError::Other(e.to_string()))
}

#[tauri::command]
pub async fn close_window(app: tauri::AppHandle) -> Result<(), LauncherError> {
    info!("Launcher closing");
    app.exit(0);
    Ok(())
}
