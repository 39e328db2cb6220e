// ─── Loader Install ───
// The NeoForge installer runs headless the first time a loader version is
// seen. It writes `versions/<id>/<id>.json` plus the patched client
// libraries; that JSON existing is what "installed" means.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::downloader::ContentTransport;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent, LogClass};

use super::process::configure_platform_spawn;
use super::profile::version_json_path;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// The installer refuses to run into a directory without one.
const LAUNCHER_PROFILES: &str = "launcher_profiles.json";

/// Subset of the installer's `install_profile.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstallProfile {
    /// Id of the version the installer creates, e.g. `neoforge-21.1.77`.
    pub version: String,
    pub minecraft: String,
}

impl InstallProfile {
    pub async fn read(installer: &Path) -> LauncherResult<Self> {
        let installer = installer.to_path_buf();
        tokio::task::spawn_blocking(move || -> LauncherResult<Self> {
            let file =
                std::fs::File::open(&installer).map_err(|e| LauncherError::io(&installer, e))?;
            let mut archive = zip::ZipArchive::new(file)?;
            let entry = archive.by_name("install_profile.json").map_err(|e| {
                LauncherError::Install(format!("missing install_profile.json: {e}"))
            })?;
            Ok(serde_json::from_reader(entry)?)
        })
        .await?
    }
}

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    id: String,
    url: String,
}

pub struct LoaderInstall<'a> {
    pub java: &'a Path,
    pub root: &'a Path,
    pub installer: &'a Path,
    pub events: &'a dyn EventSink,
}

impl LoaderInstall<'_> {
    pub async fn ensure_installed(&self) -> LauncherResult<InstallProfile> {
        let profile = InstallProfile::read(self.installer).await?;
        let version_json = version_json_path(self.root, &profile.version);
        if version_json.exists() {
            debug!("{} already installed", profile.version);
            return Ok(profile);
        }

        info!("Installing {} for {}", profile.version, profile.minecraft);
        self.events.emit(LauncherEvent::log(
            LogClass::Info,
            format!("Installing {}...", profile.version),
        ));

        self.write_launcher_profiles().await?;
        self.run_installer().await?;

        if !version_json.exists() {
            return Err(LauncherError::Install(format!(
                "installer finished without creating {}",
                version_json.display()
            )));
        }
        info!("{} installed", profile.version);
        Ok(profile)
    }

    async fn write_launcher_profiles(&self) -> LauncherResult<()> {
        let path = self.root.join(LAUNCHER_PROFILES);
        if path.exists() {
            return Ok(());
        }
        tokio::fs::create_dir_all(self.root)
            .await
            .map_err(|e| LauncherError::io(self.root, e))?;
        tokio::fs::write(&path, br#"{"profiles":{}}"#)
            .await
            .map_err(|e| LauncherError::io(&path, e))
    }

    async fn run_installer(&self) -> LauncherResult<()> {
        let mut cmd = Command::new(self.java);
        cmd.arg("-jar")
            .arg(self.installer)
            .arg("--installClient")
            .arg(self.root)
            .current_dir(self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        configure_platform_spawn(&mut cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| LauncherError::Spawn(format!("{}: {}", self.java.display(), e)))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("[installer] {}", line);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no output");
            return Err(LauncherError::Install(format!(
                "installer exited with {:?}: {}",
                output.status.code(),
                reason
            )));
        }
        Ok(())
    }
}

/// The installer normally leaves the base version JSON behind. When it is
/// missing it is taken from the official version manifest.
pub async fn ensure_base_version(
    transport: &dyn ContentTransport,
    root: &Path,
    minecraft: &str,
) -> LauncherResult<PathBuf> {
    let path = version_json_path(root, minecraft);
    if path.exists() {
        return Ok(path);
    }

    info!("Fetching version metadata for {}", minecraft);
    let manifest: VersionManifest =
        serde_json::from_str(&transport.fetch_text(VERSION_MANIFEST_URL).await?)?;
    let entry = manifest
        .versions
        .iter()
        .find(|v| v.id == minecraft)
        .ok_or_else(|| LauncherError::Install(format!("unknown game version {minecraft}")))?;

    let raw = transport.fetch_text(&entry.url).await?;
    serde_json::from_str::<serde_json::Value>(&raw)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(&path, raw)
        .await
        .map_err(|e| LauncherError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::testing::{FakeTransport, RecordingSink};
    use std::io::Write;

    pub(crate) fn write_installer(path: &Path, version: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("install_profile.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        write!(zip, r#"{{"spec":1,"version":"{version}","minecraft":"1.21.1"}}"#).unwrap();
        zip.finish().unwrap();
    }

    fn install<'a>(
        java: &'a Path,
        root: &'a Path,
        installer: &'a Path,
        events: &'a RecordingSink,
    ) -> LoaderInstall<'a> {
        LoaderInstall {
            java,
            root,
            installer,
            events,
        }
    }

    #[tokio::test]
    async fn install_profile_is_read_from_the_installer_jar() {
        let dir = tempfile::tempdir().unwrap();
        let installer = dir.path().join("neoforge-installer.jar");
        write_installer(&installer, "neoforge-21.1.77");

        let profile = InstallProfile::read(&installer).await.unwrap();
        assert_eq!(profile.version, "neoforge-21.1.77");
        assert_eq!(profile.minecraft, "1.21.1");
    }

    #[tokio::test]
    async fn installer_that_is_not_a_jar_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let installer = dir.path().join("neoforge-installer.jar");
        std::fs::write(&installer, b"<html>not found</html>").unwrap();

        let err = InstallProfile::read(&installer).await.unwrap_err();
        assert!(matches!(err, LauncherError::Zip(_)));
    }

    #[tokio::test]
    async fn installed_version_skips_the_installer() {
        let dir = tempfile::tempdir().unwrap();
        let installer = dir.path().join("neoforge-installer.jar");
        write_installer(&installer, "neoforge-21.1.77");
        let json = version_json_path(dir.path(), "neoforge-21.1.77");
        std::fs::create_dir_all(json.parent().unwrap()).unwrap();
        std::fs::write(&json, "{}").unwrap();
        let sink = RecordingSink::default();

        let java = dir.path().join("no-such-java");
        let profile = install(&java, dir.path(), &installer, &sink)
            .ensure_installed()
            .await
            .unwrap();

        assert_eq!(profile.version, "neoforge-21.1.77");
        assert!(!dir.path().join(LAUNCHER_PROFILES).exists());
        assert!(sink.rendered_logs().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn installer_that_creates_nothing_is_an_install_error() {
        let dir = tempfile::tempdir().unwrap();
        let installer = dir.path().join("neoforge-installer.jar");
        write_installer(&installer, "neoforge-21.1.77");
        let sink = RecordingSink::default();

        let err = install(Path::new("/bin/echo"), dir.path(), &installer, &sink)
            .ensure_installed()
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Install(_)));
        assert!(dir.path().join(LAUNCHER_PROFILES).is_file());
        assert_eq!(
            sink.rendered_logs(),
            vec!["[Arcend] Installing neoforge-21.1.77...".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_installer_reports_its_exit() {
        let dir = tempfile::tempdir().unwrap();
        let installer = dir.path().join("neoforge-installer.jar");
        write_installer(&installer, "neoforge-21.1.77");
        let sink = RecordingSink::default();

        let err = install(Path::new("false"), dir.path(), &installer, &sink)
            .ensure_installed()
            .await
            .unwrap_err();

        match err {
            LauncherError::Install(message) => assert!(message.contains("exited with Some(1)")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_base_version_comes_from_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new();
        transport.serve_text(
            VERSION_MANIFEST_URL,
            r#"{"versions":[{"id":"1.21.1","type":"release","url":"http://meta/1.21.1.json"}]}"#,
        );
        transport.serve_text("http://meta/1.21.1.json", r#"{"id":"1.21.1"}"#);

        let path = ensure_base_version(&transport, dir.path(), "1.21.1").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"id":"1.21.1"}"#);
        assert_eq!(transport.calls(), 2);

        ensure_base_version(&transport, dir.path(), "1.21.1").await.unwrap();
        assert_eq!(transport.calls(), 2);

        let err = ensure_base_version(&transport, dir.path(), "0.0.1").await.unwrap_err();
        assert!(matches!(err, LauncherError::Install(_)));
    }
}
