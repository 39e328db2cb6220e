pub mod files;
pub mod install;
pub mod orchestrator;
pub mod params;
pub mod process;
pub mod profile;

pub use orchestrator::{LaunchLayout, LaunchOrchestrator, LaunchOutcome, RunState};
pub use params::{LaunchParams, MemoryBounds, MIN_MEMORY_GB};
pub use process::{GameProcess, GameSpawner, JavaGameSpawner};
pub use profile::GameProfile;
