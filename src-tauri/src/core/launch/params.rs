// ─── Launch Parameters ───
// Everything the game process needs, composed once per launch attempt, and
// the command line built from it and the installed profile.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::auth::{AuthSession, SessionIdentity};

use super::profile::GameProfile;

pub const GAME_VERSION: &str = "1.21.1";
pub const MIN_MEMORY_GB: u32 = 2;
const LAUNCHER_BRAND: &str = "Arcend";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBounds {
    pub min_gb: u32,
    pub max_gb: u32,
}

impl MemoryBounds {
    /// The floor is fixed; a configured maximum below it is raised to it.
    pub fn from_config(ram_gb: u32) -> Self {
        Self {
            min_gb: MIN_MEMORY_GB,
            max_gb: ram_gb.max(MIN_MEMORY_GB),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub java: PathBuf,
    pub root: PathBuf,
    pub loader_installer: PathBuf,
    pub memory: MemoryBounds,
    pub game_version: String,
    pub session: AuthSession,
}

impl LaunchParams {
    pub fn compose(
        java: &Path,
        root: &Path,
        loader_installer: &Path,
        ram_gb: u32,
        session: AuthSession,
    ) -> Self {
        Self {
            java: java.to_path_buf(),
            root: root.to_path_buf(),
            loader_installer: loader_installer.to_path_buf(),
            memory: MemoryBounds::from_config(ram_gb),
            game_version: GAME_VERSION.to_string(),
            session,
        }
    }

    pub fn identity(&self) -> SessionIdentity {
        self.session.identity(true)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// Memory flags, the profile's JVM arguments, its main class, then the
    /// game arguments. Placeholders are filled from the session and layout;
    /// an argument left with an unknown placeholder is dropped together with
    /// the option it belongs to.
    pub fn command_args(&self, profile: &GameProfile) -> Vec<String> {
        let mut vars = self.placeholders(profile);

        // Jars on the module path must stay off the classpath or the
        // bootstrap layer loads them twice.
        let module_path = module_path_entries(&resolve_args(&profile.jvm_args, &vars));
        let classpath = self.classpath(profile, &module_path);
        vars.push(("${classpath}", classpath.clone()));

        let mut args = vec![
            format!("-Xmx{}G", self.memory.max_gb),
            format!("-Xms{}G", self.memory.min_gb),
        ];
        if profile.jvm_args.is_empty() {
            args.push(format!(
                "-Djava.library.path={}",
                path_arg(&profile.natives_dir(&self.root))
            ));
            args.push("-cp".into());
            args.push(classpath);
        } else {
            args.extend(resolve_args(&profile.jvm_args, &vars));
        }
        args.push(profile.main_class.clone());
        args.extend(resolve_args(&profile.game_args, &vars));
        args
    }

    /// Copy-pasteable command line with the access token blanked out.
    pub fn format_for_logs(&self, args: &[String]) -> String {
        let token = &self.session.credential.access_token;
        let mut parts = vec![shell_escape(&self.java.to_string_lossy())];
        parts.extend(args.iter().map(|arg| {
            if !token.is_empty() && arg == token {
                "<hidden>".to_string()
            } else {
                shell_escape(arg)
            }
        }));
        parts.join(" ")
    }

    fn placeholders(&self, profile: &GameProfile) -> Vec<(&'static str, String)> {
        let identity = self.identity();
        let credential = &self.session.credential;
        let assets = path_arg(&self.root.join("assets"));
        let asset_index = profile
            .asset_index
            .as_ref()
            .map(|index| index.id.clone())
            .unwrap_or_else(|| "legacy".into());

        vec![
            ("${auth_player_name}", identity.name),
            ("${auth_uuid}", identity.uuid),
            ("${auth_access_token}", credential.access_token.clone()),
            ("${auth_session}", credential.access_token.clone()),
            ("${auth_xuid}", credential.xuid.clone()),
            ("${clientid}", credential.client_id.clone()),
            ("${user_type}", credential.user_type.clone()),
            ("${user_properties}", "{}".into()),
            ("${version_name}", profile.jar_id.clone()),
            ("${version_type}", "release".into()),
            ("${game_directory}", path_arg(&self.root)),
            ("${assets_root}", assets.clone()),
            ("${game_assets}", assets),
            ("${assets_index_name}", asset_index),
            ("${natives_directory}", path_arg(&profile.natives_dir(&self.root))),
            ("${library_directory}", path_arg(&self.libraries_dir())),
            ("${classpath_separator}", classpath_separator().into()),
            ("${launcher_name}", LAUNCHER_BRAND.into()),
            ("${launcher_version}", env!("CARGO_PKG_VERSION").into()),
        ]
    }

    /// Libraries present on disk in profile order, then the client jar.
    fn classpath(&self, profile: &GameProfile, module_path: &HashSet<PathBuf>) -> String {
        let libraries_dir = self.libraries_dir();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for library in &profile.libraries {
            let Some(relative) = library.relative_path() else {
                continue;
            };
            let path = libraries_dir.join(relative);
            if module_path.contains(&path) {
                continue;
            }
            if !path.exists() {
                debug!("Library not found on disk (skipping): {}", library.name);
                continue;
            }
            if seen.insert(path.clone()) {
                entries.push(path_arg(&path));
            }
        }
        entries.push(path_arg(&profile.client_jar(&self.root)));
        entries.join(classpath_separator())
    }
}

fn resolve_args(raw: &[String], vars: &[(&'static str, String)]) -> Vec<String> {
    let mut resolved = Vec::with_capacity(raw.len());
    for arg in raw {
        let value = vars
            .iter()
            .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value));
        if value.contains("${") {
            drop_dangling_option(&mut resolved);
            continue;
        }
        resolved.push(value);
    }
    resolved
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        args.pop();
    }
}

fn module_path_entries(jvm_args: &[String]) -> HashSet<PathBuf> {
    let mut iter = jvm_args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-p" || arg == "--module-path" {
            return iter.next().map(|value| split_paths(value)).unwrap_or_default();
        }
        if let Some(inline) = arg.strip_prefix("--module-path=") {
            return split_paths(inline);
        }
    }
    HashSet::new()
}

fn split_paths(value: &str) -> HashSet<PathBuf> {
    value
        .split(classpath_separator())
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

pub(crate) fn path_arg(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java rejects extended-length paths in several arguments.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
