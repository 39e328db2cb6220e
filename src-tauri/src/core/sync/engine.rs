// ─── Version Sync Engine ───
// Brings the install directory to the manifest's content version.
//
// The version tag is written last: a failure anywhere before it leaves the
// old tag, so the next launch redoes the whole reconciliation.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::core::config::{Config, ConfigStore};
use crate::core::downloader::{ContentTransport, StreamedDownload};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent, LogClass, ProgressEvent};

use super::clean::{selective_clean, PRESERVED_ENTRIES};
use super::extract::extract_over_async;
use super::manifest::RemoteManifest;

pub const CONTENT_TASK: &str = "Modpack";
pub const LOADER_TASK: &str = "NeoForge";
const TEMP_ARCHIVE: &str = "update_temp.zip";

pub struct VersionSyncEngine {
    transport: Arc<dyn ContentTransport>,
    config: Arc<ConfigStore>,
    events: Arc<dyn EventSink>,
    game_dir: PathBuf,
    loader_installer: PathBuf,
    manifest_url: String,
}

impl VersionSyncEngine {
    pub fn new(
        transport: Arc<dyn ContentTransport>,
        config: Arc<ConfigStore>,
        events: Arc<dyn EventSink>,
        game_dir: PathBuf,
        loader_installer: PathBuf,
        manifest_url: String,
    ) -> Self {
        Self {
            transport,
            config,
            events,
            game_dir,
            loader_installer,
            manifest_url,
        }
    }

    /// Fetch the manifest, then [`sync`](Self::sync) against the stored config.
    pub async fn reconcile(
        &self,
        progress: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> LauncherResult<String> {
        self.log(LogClass::Info, "Checking the server...");
        let manifest = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LauncherError::Cancelled),
            fetched = RemoteManifest::fetch(self.transport.as_ref(), &self.manifest_url) => fetched?,
        };
        let config = self.config.load().await;
        self.sync(&manifest, &config, progress, cancel).await
    }

    #[instrument(skip_all, fields(installed = %config.installed_content_version, remote = %manifest.content_version))]
    pub async fn sync(
        &self,
        manifest: &RemoteManifest,
        config: &Config,
        progress: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> LauncherResult<String> {
        let version = if manifest.content_version == config.installed_content_version {
            info!("Content is up to date");
            config.installed_content_version.clone()
        } else {
            self.apply_content(manifest, progress, cancel).await?
        };

        self.ensure_loader_installer(manifest, progress, cancel)
            .await?;
        Ok(version)
    }

    async fn apply_content(
        &self,
        manifest: &RemoteManifest,
        progress: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> LauncherResult<String> {
        self.log(
            LogClass::Info,
            format!("Update detected: {}", manifest.content_version),
        );

        let report = selective_clean(&self.game_dir, PRESERVED_ENTRIES).await?;
        for (name, reason) in &report.failed {
            self.log(LogClass::Warning, format!("Cleanup skipped {name}: {reason}"));
        }
        info!("Cleanup removed {} entries", report.removed.len());

        let archive = self.game_dir.join(TEMP_ARCHIVE);
        StreamedDownload::new(self.transport.as_ref(), progress, cancel)
            .fetch(&manifest.content_archive_url, &archive, CONTENT_TASK)
            .await?;

        let extracted = extract_over_async(archive.clone(), self.game_dir.clone()).await;
        if let Err(e) = tokio::fs::remove_file(&archive).await {
            warn!("Cannot remove temporary archive {:?}: {}", archive, e);
        }
        let files = extracted?;
        info!("Extracted {} files", files);

        let version = manifest.content_version.clone();
        let tag = version.clone();
        self.config
            .update(move |mut config| {
                config.installed_content_version = tag;
                config
            })
            .await?;

        self.log(LogClass::Info, "Mods installed!");
        Ok(version)
    }

    async fn ensure_loader_installer(
        &self,
        manifest: &RemoteManifest,
        progress: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> LauncherResult<()> {
        if tokio::fs::try_exists(&self.loader_installer)
            .await
            .unwrap_or(false)
        {
            return Ok(());
        }

        self.log(LogClass::Info, "Downloading NeoForge...");
        StreamedDownload::new(self.transport.as_ref(), progress, cancel)
            .fetch(
                &manifest.loader_installer_url,
                &self.loader_installer,
                LOADER_TASK,
            )
            .await?;
        Ok(())
    }

    fn log(&self, class: LogClass, message: impl Into<String>) {
        self.events.emit(LauncherEvent::log(class, message));
    }
}
