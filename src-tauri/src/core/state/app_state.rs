use std::sync::Arc;

use tracing::info;

use crate::core::auth::{AuthSessionManager, OfflineIdentityProvider};
use crate::core::config::ConfigStore;
use crate::core::downloader::{ContentTransport, HttpTransport};
use crate::core::error::LauncherResult;
use crate::core::events::{EventSink, HostWindow};
use crate::core::launch::{JavaGameSpawner, LaunchLayout, LaunchOrchestrator};
use crate::core::sync::VersionSyncEngine;

use super::paths::LauncherPaths;

/// Every long-lived service, built once during setup and managed by Tauri.
pub struct AppState {
    pub paths: LauncherPaths,
    pub config: Arc<ConfigStore>,
    pub auth: Arc<AuthSessionManager>,
    pub orchestrator: Arc<LaunchOrchestrator>,
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(
        paths: LauncherPaths,
        events: Arc<dyn EventSink>,
        window: Arc<dyn HostWindow>,
    ) -> LauncherResult<Self> {
        paths.ensure_dirs()?;

        let config = Arc::new(ConfigStore::new(paths.config_file.clone()));
        let auth = Arc::new(AuthSessionManager::new(
            Arc::new(OfflineIdentityProvider::from_env()),
            config.clone(),
        ));
        let transport: Arc<dyn ContentTransport> = Arc::new(HttpTransport::new()?);
        let sync = Arc::new(VersionSyncEngine::new(
            transport.clone(),
            config.clone(),
            events.clone(),
            paths.game_dir.clone(),
            paths.loader_installer.clone(),
            paths.manifest_url.clone(),
        ));
        let orchestrator = Arc::new(LaunchOrchestrator::new(
            auth.clone(),
            sync,
            config.clone(),
            Arc::new(JavaGameSpawner::new(transport, events.clone())),
            events.clone(),
            window,
            LaunchLayout {
                java: paths.java.clone(),
                root: paths.game_dir.clone(),
                loader_installer: paths.loader_installer.clone(),
            },
        ));

        info!("Launcher state ready");
        Ok(Self {
            paths,
            config,
            auth,
            orchestrator,
            events,
        })
    }
}
