pub mod clean;
pub mod engine;
pub mod extract;
pub mod manifest;

pub use clean::{selective_clean, LOADER_INSTALLER_FILE, PRESERVED_ENTRIES};
pub use engine::VersionSyncEngine;
pub use manifest::{RemoteManifest, DEFAULT_MANIFEST_URL};
