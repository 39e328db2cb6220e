// ─── Remote Manifest ───
// Fetched on every launch, never persisted.

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::ContentTransport;
use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_MANIFEST_URL: &str = "http://51.89.138.186/versions.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteManifest {
    #[serde(rename = "contentVersion", alias = "arcend-modpack-version")]
    pub content_version: String,
    #[serde(rename = "contentArchiveURL", alias = "arcend-modpack-url")]
    pub content_archive_url: String,
    #[serde(rename = "loaderInstallerURL", alias = "arcend-neoforge-url")]
    pub loader_installer_url: String,
}

impl RemoteManifest {
    pub fn parse(body: &str) -> LauncherResult<Self> {
        let manifest: RemoteManifest =
            serde_json::from_str(body).map_err(|e| LauncherError::Manifest(e.to_string()))?;

        if manifest.content_version.trim().is_empty() {
            return Err(LauncherError::Manifest("empty content version".into()));
        }
        Ok(manifest)
    }

    pub async fn fetch(transport: &dyn ContentTransport, url: &str) -> LauncherResult<Self> {
        info!("Fetching content manifest from {}", url);
        let body = transport.fetch_text(url).await?;
        let manifest = Self::parse(&body)?;
        info!("Remote content version is {}", manifest.content_version);
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_field_names() {
        let manifest = RemoteManifest::parse(
            r#"{
                "contentVersion": "1.2.0",
                "contentArchiveURL": "http://host/pack.zip",
                "loaderInstallerURL": "http://host/neoforge.jar"
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.content_version, "1.2.0");
        assert_eq!(manifest.content_archive_url, "http://host/pack.zip");
        assert_eq!(manifest.loader_installer_url, "http://host/neoforge.jar");
    }

    #[test]
    fn accepts_legacy_field_names() {
        let manifest = RemoteManifest::parse(
            r#"{
                "arcend-modpack-version": "1.1.0",
                "arcend-modpack-url": "http://host/pack.zip",
                "arcend-neoforge-url": "http://host/neoforge.jar"
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.content_version, "1.1.0");
    }

    #[test]
    fn missing_field_is_a_manifest_error() {
        let err = RemoteManifest::parse(r#"{ "contentVersion": "1.2.0" }"#).unwrap_err();
        assert!(matches!(err, LauncherError::Manifest(_)));
    }

    #[test]
    fn blank_version_is_rejected() {
        let err = RemoteManifest::parse(
            r#"{"contentVersion": " ", "contentArchiveURL": "a", "loaderInstallerURL": "b"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LauncherError::Manifest(_)));
    }
}
