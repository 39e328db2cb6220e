// ─── Launcher Paths ───
// Process configuration, resolved once at startup. Environment variables
// override the defaults:
//   ARCEND_GAME_DIR      install directory (default: <data dir>/.arcend)
//   ARCEND_MANIFEST_URL  remote content manifest
//   ARCEND_JAVA          java binary (default: bundled runtime, then PATH)

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::sync::{DEFAULT_MANIFEST_URL, LOADER_INSTALLER_FILE};

const GAME_DIR_NAME: &str = ".arcend";
const BUNDLED_JAVA_DIR: &str = "java-21";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    pub game_dir: PathBuf,
    pub config_file: PathBuf,
    pub loader_installer: PathBuf,
    pub java: PathBuf,
    pub manifest_url: String,
    /// Directory holding the launcher executable.
    pub launcher_dir: PathBuf,
}

impl LauncherPaths {
    pub fn resolve(resource_dir: Option<&Path>) -> Self {
        let paths = Self::from_lookup(
            |key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()),
            dirs::data_dir(),
            resource_dir,
            std::env::current_exe().ok(),
        );
        info!("Game directory: {:?}", paths.game_dir);
        debug!("Java binary: {:?}", paths.java);
        paths
    }

    fn from_lookup(
        var: impl Fn(&str) -> Option<String>,
        data_dir: Option<PathBuf>,
        resource_dir: Option<&Path>,
        current_exe: Option<PathBuf>,
    ) -> Self {
        let game_dir = var("ARCEND_GAME_DIR").map(PathBuf::from).unwrap_or_else(|| {
            data_dir
                .unwrap_or_else(|| PathBuf::from("."))
                .join(GAME_DIR_NAME)
        });

        let java = var("ARCEND_JAVA")
            .map(PathBuf::from)
            .or_else(|| resource_dir.map(bundled_java).filter(|p| p.exists()))
            .unwrap_or_else(|| PathBuf::from(java_binary_name()));

        let launcher_dir = current_exe
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_file: game_dir.join("config").join("app.json"),
            loader_installer: game_dir.join(LOADER_INSTALLER_FILE),
            manifest_url: var("ARCEND_MANIFEST_URL")
                .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string()),
            game_dir,
            java,
            launcher_dir,
        }
    }

    pub fn ensure_dirs(&self) -> LauncherResult<()> {
        let config_dir = self
            .config_file
            .parent()
            .ok_or_else(|| LauncherError::Other("config file has no parent".into()))?;
        std::fs::create_dir_all(config_dir).map_err(|e| LauncherError::io(config_dir, e))
    }
}

fn bundled_java(resource_dir: &Path) -> PathBuf {
    resource_dir
        .join("runtime")
        .join(BUNDLED_JAVA_DIR)
        .join("bin")
        .join(java_binary_name())
}

fn java_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_live_under_the_data_dir() {
        let paths = LauncherPaths::from_lookup(
            lookup(&[]),
            Some(PathBuf::from("/data")),
            None,
            Some(PathBuf::from("/opt/arcend/arcend-launcher")),
        );

        assert_eq!(paths.game_dir, PathBuf::from("/data/.arcend"));
        assert_eq!(paths.config_file, PathBuf::from("/data/.arcend/config/app.json"));
        assert_eq!(
            paths.loader_installer,
            PathBuf::from("/data/.arcend/neoforge-installer.jar")
        );
        assert_eq!(paths.java, PathBuf::from(java_binary_name()));
        assert_eq!(paths.manifest_url, DEFAULT_MANIFEST_URL);
        assert_eq!(paths.launcher_dir, PathBuf::from("/opt/arcend"));
    }

    #[test]
    fn environment_overrides_win() {
        let paths = LauncherPaths::from_lookup(
            lookup(&[
                ("ARCEND_GAME_DIR", "/games/arcend"),
                ("ARCEND_JAVA", "/usr/lib/jvm/21/bin/java"),
                ("ARCEND_MANIFEST_URL", "http://localhost/versions.json"),
            ]),
            Some(PathBuf::from("/data")),
            None,
            None,
        );

        assert_eq!(paths.game_dir, PathBuf::from("/games/arcend"));
        assert_eq!(paths.java, PathBuf::from("/usr/lib/jvm/21/bin/java"));
        assert_eq!(paths.manifest_url, "http://localhost/versions.json");
    }

    #[test]
    fn bundled_runtime_is_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let java = bundled_java(dir.path());
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"").unwrap();

        let paths =
            LauncherPaths::from_lookup(lookup(&[]), None, Some(dir.path()), None);
        assert_eq!(paths.java, java);
    }

    #[test]
    fn ensure_dirs_creates_the_config_folder() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::from_lookup(
            lookup(&[]),
            Some(dir.path().to_path_buf()),
            None,
            None,
        );

        paths.ensure_dirs().unwrap();
        assert!(dir.path().join(".arcend/config").is_dir());
    }
}
