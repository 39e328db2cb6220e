// ─── Game Profile ───
// Reads an installed version JSON, follows `inheritsFrom` and evaluates the
// OS rules, leaving exactly the libraries and arguments this machine needs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionFile {
    pub id: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// Either a plain string or a value guarded by rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<Download>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Download {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository base for libraries without a `downloads` block.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Download>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Mojang rule semantics: start disallowed, the last matching rule wins.
/// No launcher feature (demo mode, custom resolution, quick play) is ever
/// enabled, so feature-gated rules never match.
pub fn rules_allow(rules: &[Rule]) -> bool {
    let mut allowed = false;
    for rule in rules {
        if rule.features.as_ref().is_some_and(|f| !f.is_empty()) {
            continue;
        }
        let os_matches = rule.os.as_ref().map_or(true, |os| {
            os.name.as_deref().map_or(true, |name| name == current_os_name())
                && os.arch.as_deref().map_or(true, |arch| arch == current_arch())
        });
        if os_matches {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn current_arch() -> &'static str {
    if cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else {
        "x86_64"
    }
}

impl Library {
    pub fn applies(&self) -> bool {
        self.rules.as_deref().map_or(true, rules_allow)
    }

    /// Path below the libraries directory.
    pub fn relative_path(&self) -> Option<PathBuf> {
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.as_deref());
        match declared {
            Some(path) => Some(PathBuf::from(path)),
            None => maven_path(&self.name),
        }
    }

    /// Where a missing file can be fetched from, with its expected SHA-1.
    pub fn download(&self) -> Option<Download> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return (!artifact.url.is_empty()).then(|| artifact.clone());
        }
        let base = self.url.as_deref()?;
        let path = maven_path(&self.name)?;
        Some(Download {
            url: format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.to_string_lossy().replace('\\', "/")
            ),
            sha1: None,
            path: None,
        })
    }

    /// group:artifact[:classifier], used to let a child profile override a
    /// library its parent also declares.
    fn key(&self) -> String {
        let mut parts = self.name.split('@').next().unwrap_or("").split(':');
        let group = parts.next().unwrap_or("");
        let artifact = parts.next().unwrap_or("");
        let _version = parts.next();
        match parts.next() {
            Some(classifier) => format!("{group}:{artifact}:{classifier}"),
            None => format!("{group}:{artifact}"),
        }
    }
}

/// `group:artifact:version[:classifier][@ext]` to the Maven repository layout.
pub fn maven_path(coordinate: &str) -> Option<PathBuf> {
    let (coordinate, extension) = match coordinate.split_once('@') {
        Some((coordinate, extension)) => (coordinate, extension),
        None => (coordinate, "jar"),
    };
    let parts: Vec<&str> = coordinate.split(':').collect();
    let (group, artifact, version, classifier) = match parts.as_slice() {
        [group, artifact, version] => (*group, *artifact, *version, None),
        [group, artifact, version, classifier] => (*group, *artifact, *version, Some(*classifier)),
        _ => return None,
    };

    let file = match classifier {
        Some(classifier) => format!("{artifact}-{version}-{classifier}.{extension}"),
        None => format!("{artifact}-{version}.{extension}"),
    };
    let mut path = PathBuf::new();
    for segment in group.split('.') {
        path.push(segment);
    }
    Some(path.join(artifact).join(version).join(file))
}

pub fn version_json_path(root: &Path, id: &str) -> PathBuf {
    root.join("versions").join(id).join(format!("{id}.json"))
}

impl VersionFile {
    pub async fn read(root: &Path, id: &str) -> LauncherResult<Self> {
        let path = version_json_path(root, id);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// An installed version merged with its parent and filtered for this OS.
#[derive(Debug, Clone)]
pub struct GameProfile {
    pub id: String,
    /// Version whose client jar goes on the classpath.
    pub jar_id: String,
    pub main_class: String,
    pub libraries: Vec<Library>,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
    pub asset_index: Option<AssetIndexRef>,
    pub client_download: Option<Download>,
}

impl GameProfile {
    pub async fn load(root: &Path, id: &str) -> LauncherResult<Self> {
        let child = VersionFile::read(root, id).await?;
        let parent = match child.inherits_from.as_deref() {
            Some(parent_id) => Some(VersionFile::read(root, parent_id).await?),
            None => None,
        };
        Self::merge(child, parent)
    }

    /// Child libraries come first and shadow the parent's copy of the same
    /// artifact. Parent arguments come before the child's.
    pub fn merge(child: VersionFile, parent: Option<VersionFile>) -> LauncherResult<Self> {
        let main_class = child
            .main_class
            .clone()
            .or_else(|| parent.as_ref().and_then(|p| p.main_class.clone()))
            .ok_or_else(|| LauncherError::Install(format!("{} has no main class", child.id)))?;

        let jar_id = child
            .jar
            .clone()
            .or_else(|| child.inherits_from.clone())
            .unwrap_or_else(|| child.id.clone());

        let mut seen = HashSet::new();
        let mut libraries = Vec::new();
        let parent_libraries = parent.iter().flat_map(|p| p.libraries.iter());
        for library in child.libraries.iter().chain(parent_libraries) {
            if !library.applies() {
                debug!("Skipping library (OS rule): {}", library.name);
                continue;
            }
            if seen.insert(library.key()) {
                libraries.push(library.clone());
            }
        }

        let mut jvm_args = Vec::new();
        let mut game_args = Vec::new();
        for arguments in parent
            .iter()
            .filter_map(|p| p.arguments.as_ref())
            .chain(child.arguments.as_ref())
        {
            jvm_args.extend(flatten_arguments(&arguments.jvm));
            game_args.extend(flatten_arguments(&arguments.game));
        }

        let asset_index = child
            .asset_index
            .clone()
            .or_else(|| parent.as_ref().and_then(|p| p.asset_index.clone()));
        let client_download = parent
            .as_ref()
            .and_then(|p| p.downloads.as_ref())
            .or(child.downloads.as_ref())
            .and_then(|d| d.client.clone());

        Ok(Self {
            id: child.id,
            jar_id,
            main_class,
            libraries,
            jvm_args,
            game_args,
            asset_index,
            client_download,
        })
    }

    pub fn client_jar(&self, root: &Path) -> PathBuf {
        root.join("versions")
            .join(&self.jar_id)
            .join(format!("{}.jar", self.jar_id))
    }

    pub fn natives_dir(&self, root: &Path) -> PathBuf {
        root.join("versions").join(&self.id).join("natives")
    }
}

fn flatten_arguments(arguments: &[Argument]) -> Vec<String> {
    arguments
        .iter()
        .flat_map(|argument| match argument {
            Argument::Plain(value) => vec![value.clone()],
            Argument::Conditional { rules, value } if rules_allow(rules) => match value {
                ArgumentValue::One(value) => vec![value.clone()],
                ArgumentValue::Many(values) => values.clone(),
            },
            Argument::Conditional { .. } => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn version(value: serde_json::Value) -> VersionFile {
        serde_json::from_value(value).unwrap()
    }

    fn vanilla() -> VersionFile {
        version(json!({
            "id": "1.21.1",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": { "id": "17", "url": "http://meta/17.json", "sha1": "abc" },
            "downloads": { "client": { "url": "http://meta/client.jar", "sha1": "def" } },
            "libraries": [
                { "name": "org.ow2.asm:asm:9.3",
                  "downloads": { "artifact": { "path": "org/ow2/asm/asm/9.3/asm-9.3.jar", "url": "http://libs/asm-9.3.jar", "sha1": "1" } } },
                { "name": "com.mojang:logging:1.2.7" },
                { "name": "org.lwjgl:lwjgl:3.3.3:natives-other",
                  "rules": [{ "action": "allow", "os": { "name": "no-such-os" } }] }
            ],
            "arguments": {
                "game": [
                    "--username", "${auth_player_name}",
                    { "rules": [{ "action": "allow", "features": { "is_demo_user": true } }], "value": "--demo" }
                ],
                "jvm": [
                    { "rules": [{ "action": "allow", "os": { "name": "no-such-os" } }], "value": ["-XstartOnFirstThread"] },
                    "-cp", "${classpath}"
                ]
            }
        }))
    }

    fn neoforge() -> VersionFile {
        version(json!({
            "id": "neoforge-21.1.77",
            "inheritsFrom": "1.21.1",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "libraries": [
                { "name": "org.ow2.asm:asm:9.7",
                  "downloads": { "artifact": { "path": "org/ow2/asm/asm/9.7/asm-9.7.jar", "url": "https://maven/asm-9.7.jar", "sha1": "2" } } },
                { "name": "net.neoforged:bus:8.0.1", "url": "https://maven.neoforged.net/releases/" }
            ],
            "arguments": {
                "game": ["--fml.neoForgeVersion", "21.1.77"],
                "jvm": ["-DlibraryDirectory=${library_directory}"]
            }
        }))
    }

    #[test]
    fn maven_paths_follow_repository_layout() {
        assert_eq!(
            maven_path("net.neoforged:bus:8.0.1").unwrap(),
            Path::new("net/neoforged/bus/8.0.1/bus-8.0.1.jar")
        );
        assert_eq!(
            maven_path("org.lwjgl:lwjgl:3.3.3:natives-linux").unwrap(),
            Path::new("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar")
        );
        assert_eq!(
            maven_path("de.oceanlabs.mcp:mcp_config:1.21.1@zip").unwrap(),
            Path::new("de/oceanlabs/mcp/mcp_config/1.21.1/mcp_config-1.21.1.zip")
        );
        assert!(maven_path("not-a-coordinate").is_none());
    }

    #[test]
    fn rules_start_disallowed_and_last_match_wins() {
        let rules: Vec<Rule> = serde_json::from_value(json!([
            { "action": "allow" },
            { "action": "disallow", "os": { "name": current_os_name() } }
        ]))
        .unwrap();
        assert!(!rules_allow(&rules));
        assert!(!rules_allow(&[]));

        let feature_only: Vec<Rule> = serde_json::from_value(json!([
            { "action": "allow", "features": { "has_custom_resolution": true } }
        ]))
        .unwrap();
        assert!(!rules_allow(&feature_only));
    }

    #[test]
    fn merge_prefers_child_libraries_and_appends_child_arguments() {
        let profile = GameProfile::merge(neoforge(), Some(vanilla())).unwrap();

        assert_eq!(profile.id, "neoforge-21.1.77");
        assert_eq!(profile.jar_id, "1.21.1");
        assert_eq!(profile.main_class, "cpw.mods.bootstraplauncher.BootstrapLauncher");

        let names: Vec<&str> = profile.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["org.ow2.asm:asm:9.7", "net.neoforged:bus:8.0.1", "com.mojang:logging:1.2.7"]
        );

        assert_eq!(
            profile.game_args,
            vec!["--username", "${auth_player_name}", "--fml.neoForgeVersion", "21.1.77"]
        );
        assert_eq!(
            profile.jvm_args,
            vec!["-cp", "${classpath}", "-DlibraryDirectory=${library_directory}"]
        );
        assert_eq!(profile.asset_index.unwrap().id, "17");
        assert_eq!(profile.client_download.unwrap().url, "http://meta/client.jar");
    }

    #[test]
    fn library_download_falls_back_to_maven_base() {
        let profile = GameProfile::merge(neoforge(), Some(vanilla())).unwrap();
        let bus = &profile.libraries[1];
        assert_eq!(
            bus.download().unwrap().url,
            "https://maven.neoforged.net/releases/net/neoforged/bus/8.0.1/bus-8.0.1.jar"
        );
        assert!(profile.libraries[2].download().is_none());
    }

    #[test]
    fn profile_without_main_class_is_rejected() {
        let orphan = version(json!({ "id": "broken", "inheritsFrom": "1.21.1" }));
        let err = GameProfile::merge(orphan, None).unwrap_err();
        assert!(matches!(err, LauncherError::Install(_)));
    }

    #[tokio::test]
    async fn load_reads_child_and_parent_from_versions_dir() {
        let dir = tempfile::tempdir().unwrap();
        for (id, body) in [
            ("1.21.1", r#"{"id":"1.21.1","mainClass":"net.minecraft.client.main.Main"}"#),
            ("neoforge-21.1.77", r#"{"id":"neoforge-21.1.77","inheritsFrom":"1.21.1"}"#),
        ] {
            let path = version_json_path(dir.path(), id);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }

        let profile = GameProfile::load(dir.path(), "neoforge-21.1.77").await.unwrap();
        assert_eq!(profile.main_class, "net.minecraft.client.main.Main");
        assert_eq!(
            profile.client_jar(dir.path()),
            dir.path().join("versions").join("1.21.1").join("1.21.1.jar")
        );
    }
}
