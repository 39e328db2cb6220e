// ─── Game Files ───
// Libraries, the client jar and assets of a profile, fetched only when
// missing. Every file is checked against its SHA-1 before it is moved into
// place.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use futures_util::{stream, StreamExt};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use crate::core::downloader::client::{partial_path, percent_of};
use crate::core::downloader::{ContentTransport, RemoteBody};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent, ProgressEvent};
use crate::core::http::CHUNK_IDLE_TIMEOUT;

use super::profile::GameProfile;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const LIBRARIES_TASK: &str = "Libraries";
pub const ASSETS_TASK: &str = "Assets";
const PARALLEL_DOWNLOADS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssetIndex {
    objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
struct AssetObject {
    hash: String,
}

pub struct GameFiles<'a> {
    transport: &'a dyn ContentTransport,
    events: &'a dyn EventSink,
    root: &'a Path,
}

impl<'a> GameFiles<'a> {
    pub fn new(transport: &'a dyn ContentTransport, events: &'a dyn EventSink, root: &'a Path) -> Self {
        Self {
            transport,
            events,
            root,
        }
    }

    /// A missing library or client jar fails the launch. Asset failures are
    /// logged and skipped.
    pub async fn ensure(&self, profile: &GameProfile) -> LauncherResult<()> {
        let requests = self.missing_libraries(profile)?;
        if let Some(err) = self.fetch_all(LIBRARIES_TASK, requests).await.into_iter().next() {
            return Err(err);
        }

        if let Some(requests) = self.missing_assets(profile).await? {
            let failures = self.fetch_all(ASSETS_TASK, requests).await;
            if !failures.is_empty() {
                warn!("{} asset downloads failed", failures.len());
            }
        }
        Ok(())
    }

    fn missing_libraries(&self, profile: &GameProfile) -> LauncherResult<Vec<FileRequest>> {
        let libraries_dir = self.root.join("libraries");
        let mut requests = Vec::new();

        for library in &profile.libraries {
            let Some(relative) = library.relative_path() else {
                warn!("Unreadable library coordinate: {}", library.name);
                continue;
            };
            let dest = libraries_dir.join(relative);
            if dest.exists() {
                continue;
            }
            match library.download() {
                Some(download) => requests.push(FileRequest {
                    url: download.url,
                    dest,
                    sha1: download.sha1,
                }),
                None => debug!("Library not on disk and not downloadable: {}", library.name),
            }
        }

        let client_jar = profile.client_jar(self.root);
        if !client_jar.exists() {
            let download = profile.client_download.as_ref().ok_or_else(|| {
                LauncherError::Install(format!("client jar missing: {}", client_jar.display()))
            })?;
            requests.push(FileRequest {
                url: download.url.clone(),
                dest: client_jar,
                sha1: download.sha1.clone(),
            });
        }

        Ok(requests)
    }

    async fn missing_assets(&self, profile: &GameProfile) -> LauncherResult<Option<Vec<FileRequest>>> {
        let Some(index_ref) = profile.asset_index.as_ref() else {
            return Ok(None);
        };

        let assets_dir = self.root.join("assets");
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", index_ref.id));
        if !index_path.exists() {
            fetch_one(
                self.transport,
                &FileRequest {
                    url: index_ref.url.clone(),
                    dest: index_path.clone(),
                    sha1: index_ref.sha1.clone(),
                },
            )
            .await?;
        }

        let raw = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|e| LauncherError::io(&index_path, e))?;
        let index: AssetIndex = serde_json::from_str(&raw)?;

        let objects_dir = assets_dir.join("objects");
        let mut seen = HashSet::new();
        let total = index.objects.len();
        let requests: Vec<FileRequest> = index
            .objects
            .into_values()
            .filter(|object| object.hash.len() > 2 && seen.insert(object.hash.clone()))
            .filter_map(|object| {
                let prefix = &object.hash[..2];
                let dest = objects_dir.join(prefix).join(&object.hash);
                (!dest.exists()).then(|| FileRequest {
                    url: format!("{RESOURCES_URL}/{prefix}/{}", object.hash),
                    dest,
                    sha1: Some(object.hash.clone()),
                })
            })
            .collect();

        info!(
            "Asset index {}: {} objects, {} missing",
            index_ref.id,
            total,
            requests.len()
        );
        Ok(Some(requests))
    }

    /// Downloads with bounded parallelism. Progress counts finished files
    /// and ends with one `done` event; nothing is emitted when there is
    /// nothing to fetch.
    async fn fetch_all(&self, task: &str, requests: Vec<FileRequest>) -> Vec<LauncherError> {
        if requests.is_empty() {
            return Vec::new();
        }

        let total = requests.len() as u64;
        let mut finished = 0_u64;
        let mut last_percent = None;
        let mut failures = Vec::new();

        let fetches: Vec<_> = requests
            .iter()
            .map(|request| fetch_one(self.transport, request))
            .collect();
        let mut downloads = stream::iter(fetches).buffer_unordered(PARALLEL_DOWNLOADS);

        while let Some(result) = downloads.next().await {
            finished += 1;
            if let Err(e) = result {
                warn!("{} download failed: {}", task, e);
                failures.push(e);
            }

            let percent = percent_of(finished, Some(total));
            if finished < total && last_percent != Some(percent) {
                last_percent = Some(percent);
                self.events
                    .emit(LauncherEvent::Progress(ProgressEvent::base(task, percent)));
            }
        }

        self.events
            .emit(LauncherEvent::Progress(ProgressEvent::finished(task)));
        failures
    }
}

async fn fetch_one(transport: &dyn ContentTransport, request: &FileRequest) -> LauncherResult<()> {
    let RemoteBody {
        content_length,
        mut chunks,
    } = transport.open(&request.url).await?;

    let mut body = Vec::with_capacity(content_length.unwrap_or(0) as usize);
    loop {
        let next = tokio::time::timeout(CHUNK_IDLE_TIMEOUT, chunks.next())
            .await
            .map_err(|_| LauncherError::Timeout {
                url: request.url.clone(),
            })?;
        match next {
            Some(chunk) => body.extend_from_slice(&chunk?),
            None => break,
        }
    }

    if let Some(expected) = &request.sha1 {
        let actual = hex::encode(Sha1::digest(&body));
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(LauncherError::Checksum {
                path: request.dest.clone(),
                expected: expected.clone(),
                actual,
            });
        }
    }

    if let Some(parent) = request.dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    let partial = partial_path(&request.dest);
    tokio::fs::write(&partial, &body)
        .await
        .map_err(|e| LauncherError::io(&partial, e))?;
    tokio::fs::rename(&partial, &request.dest)
        .await
        .map_err(|e| LauncherError::io(&request.dest, e))?;

    debug!("Fetched {} -> {:?}", request.url, request.dest);
    Ok(())
}
