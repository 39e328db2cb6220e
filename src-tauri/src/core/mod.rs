// ─── Arcend Launcher Core ───
// Keeps the install directory in step with the server and runs the game.
//
// Architecture:
//   core/
//     config/      Persisted launcher settings (config/app.json)
//     auth/        Session manager over a black-box identity provider
//     downloader/  HTTP transport and streamed downloads with progress
//     sync/        Manifest check, selective clean, archive extraction
//     launch/      Launch parameters, game process, orchestrator
//     state/       Paths and the application context
//     events.rs    Log/progress events and the window seam

pub mod auth;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod launch;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
