use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::ProgressEvent;
use crate::core::http::{build_http_client, CHUNK_IDLE_TIMEOUT, REQUEST_TIMEOUT};

pub type ByteStream = Pin<Box<dyn Stream<Item = LauncherResult<Bytes>> + Send>>;

/// An opened response body, not yet consumed.
pub struct RemoteBody {
    pub content_length: Option<u64>,
    pub chunks: ByteStream,
}

/// Network boundary of the sync engine.
#[async_trait]
pub trait ContentTransport: Send + Sync {
    async fn fetch_text(&self, url: &str) -> LauncherResult<String>;
    async fn open(&self, url: &str) -> LauncherResult<RemoteBody>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

#[async_trait]
impl ContentTransport for HttpTransport {
    async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| timeout_aware(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| timeout_aware(url, e))
    }

    async fn open(&self, url: &str) -> LauncherResult<RemoteBody> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| timeout_aware(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(LauncherError::from))
            .boxed();

        Ok(RemoteBody {
            content_length,
            chunks,
        })
    }
}

fn timeout_aware(url: &str, err: reqwest::Error) -> LauncherError {
    if err.is_timeout() {
        LauncherError::Timeout {
            url: url.to_string(),
        }
    } else {
        LauncherError::Http(err)
    }
}

/// Rounded percentage, clamped to 100. Unknown length reports 0 until done.
pub fn percent_of(received: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            let pct = (received as f64 / total as f64 * 100.0).round();
            pct.clamp(0.0, 100.0) as u8
        }
        _ => 0,
    }
}

/// Streams `url` into `dest`, reporting progress after every chunk.
pub struct StreamedDownload<'a> {
    pub transport: &'a dyn ContentTransport,
    pub progress: &'a mpsc::Sender<ProgressEvent>,
    pub cancel: &'a CancellationToken,
    pub idle_timeout: Duration,
}

impl<'a> StreamedDownload<'a> {
    pub fn new(
        transport: &'a dyn ContentTransport,
        progress: &'a mpsc::Sender<ProgressEvent>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            transport,
            progress,
            cancel,
            idle_timeout: CHUNK_IDLE_TIMEOUT,
        }
    }

    /// The body is written to a `.part` sibling and renamed into place, so
    /// `dest` only ever exists complete. Returns the number of bytes written.
    pub async fn fetch(&self, url: &str, dest: &Path, task: &str) -> LauncherResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let partial = partial_path(dest);
        let result = self.stream_into(url, &partial, task).await;

        match result {
            Ok(written) => {
                tokio::fs::rename(&partial, dest)
                    .await
                    .map_err(|e| LauncherError::io(dest, e))?;
                let _ = self.progress.send(ProgressEvent::finished(task)).await;
                debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
                Ok(written)
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&partial).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Cannot remove partial download {:?}: {}", partial, e);
                    }
                }
                Err(err)
            }
        }
    }

    async fn stream_into(&self, url: &str, partial: &Path, task: &str) -> LauncherResult<u64> {
        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(LauncherError::Cancelled),
            opened = tokio::time::timeout(self.idle_timeout, self.transport.open(url)) => {
                opened.map_err(|_| LauncherError::Timeout { url: url.to_string() })??
            }
        };

        info!(
            "Downloading {} ({} bytes) for {}",
            url,
            body.content_length
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".into()),
            task
        );

        let RemoteBody {
            content_length,
            mut chunks,
        } = body;

        // Written inside a block so the handle is dropped before the rename.
        let mut received = 0_u64;
        {
            let mut file = tokio::fs::File::create(partial)
                .await
                .map_err(|e| LauncherError::io(partial, e))?;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(LauncherError::Cancelled),
                    next = tokio::time::timeout(self.idle_timeout, chunks.next()) => {
                        next.map_err(|_| LauncherError::Timeout { url: url.to_string() })?
                    }
                };

                let Some(chunk) = next else { break };
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(partial, e))?;
                received += chunk.len() as u64;

                let percent = percent_of(received, content_length);
                // A closed receiver only means nobody is watching.
                let _ = self
                    .progress
                    .send(ProgressEvent::base(task, percent))
                    .await;
            }

            file.flush()
                .await
                .map_err(|e| LauncherError::io(partial, e))?;
        }

        Ok(received)
    }
}

pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
