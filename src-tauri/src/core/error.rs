use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Timed out waiting for {url}")]
    Timeout { url: String },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Auth ────────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Another sign-in attempt is already in progress")]
    AuthBusy,

    // ── Launch ──────────────────────────────────────────
    #[error("Could not start the game: {0}")]
    Spawn(String),

    #[error("Game installation failed: {0}")]
    Install(String),

    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Coarse failure classes used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Filesystem,
    Launch,
    Cancelled,
    Other,
}

impl LauncherError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LauncherError::Http(_)
            | LauncherError::DownloadFailed { .. }
            | LauncherError::Timeout { .. }
            | LauncherError::Manifest(_) => ErrorCategory::Network,
            LauncherError::Auth(_) | LauncherError::AuthBusy => ErrorCategory::Auth,
            LauncherError::Io { .. } | LauncherError::Json(_) | LauncherError::Zip(_) => {
                ErrorCategory::Filesystem
            }
            LauncherError::Checksum { .. } => ErrorCategory::Network,
            LauncherError::Spawn(_) | LauncherError::Install(_) => ErrorCategory::Launch,
            LauncherError::Cancelled => ErrorCategory::Cancelled,
            LauncherError::Other(_) => ErrorCategory::Other,
        }
    }

    /// Attach a path to an IO error produced by `?` on a bare `std::io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for LauncherError {
    fn from(err: tokio::task::JoinError) -> Self {
        LauncherError::Other(format!("background task failed: {err}"))
    }
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
