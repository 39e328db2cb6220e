use std::path::Path;

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

pub const LOADER_INSTALLER_FILE: &str = "neoforge-installer.jar";

/// User-owned entries that survive a content update.
pub const PRESERVED_ENTRIES: &[&str] = &[
    "options.txt",
    "servers.dat",
    "saves",
    "screenshots",
    "resourcepacks",
    "shaderpacks",
    "config",
    LOADER_INSTALLER_FILE,
];

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub fn is_preserved(name: &str, preserve: &[&str]) -> bool {
    name.starts_with('.') || preserve.contains(&name)
}

/// Best effort: a failing entry is reported and skipped, never fatal.
/// Only listing the directory itself can fail.
pub async fn selective_clean(dir: &Path, preserve: &[&str]) -> LauncherResult<CleanReport> {
    let mut report = CleanReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(LauncherError::io(dir, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_preserved(&name, preserve) {
            continue;
        }

        let path = entry.path();
        let removal = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
            Ok(_) => tokio::fs::remove_file(&path).await,
            Err(e) => Err(e),
        };

        match removal {
            Ok(()) => {
                debug!("Removed {:?}", path);
                report.removed.push(name);
            }
            Err(e) => {
                warn!("Cleanup skipped {:?}: {}", path, e);
                report.failed.push((name, e.to_string()));
            }
        }
    }

    report.removed.sort();
    Ok(report)
}
