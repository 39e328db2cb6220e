// ─── Presentation Events ───
// Everything the backend tells the webview goes through `EventSink`.
// The Tauri adapter lives in `bridge.rs`; tests record into memory.

use serde::Serialize;

/// Classification of a user-facing log line. Rendered as a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogClass {
    Info,
    Config,
    Warning,
    AuthError,
    SyncError,
    Fatal,
    /// Raw output of the game process, relayed verbatim.
    Game,
}

impl LogClass {
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            LogClass::Info => Some("[Arcend]"),
            LogClass::Config => Some("[Config]"),
            LogClass::Warning => Some("[Warning]"),
            LogClass::AuthError => Some("[Auth Error]"),
            LogClass::SyncError => Some("[Sync Error]"),
            LogClass::Fatal => Some("[Fatal Error]"),
            LogClass::Game => None,
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            LogClass::AuthError | LogClass::SyncError | LogClass::Fatal
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressPhase {
    #[serde(rename = "BASE")]
    Base,
}

/// One step of a download. Every download ends with exactly one event
/// where `done` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub phase: ProgressPhase,
    pub task: String,
    #[serde(rename = "total")]
    pub percent: u8,
    pub done: bool,
}

impl ProgressEvent {
    pub fn base(task: &str, percent: u8) -> Self {
        Self {
            phase: ProgressPhase::Base,
            task: task.to_string(),
            percent,
            done: false,
        }
    }

    pub fn finished(task: &str) -> Self {
        Self {
            phase: ProgressPhase::Base,
            task: task.to_string(),
            percent: 100,
            done: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherEvent {
    Log { class: LogClass, message: String },
    Progress(ProgressEvent),
    Version(String),
    GameClosed,
}

impl LauncherEvent {
    pub fn log(class: LogClass, message: impl Into<String>) -> Self {
        LauncherEvent::Log {
            class,
            message: message.into(),
        }
    }

    /// The single line shown in the console panel for a log event.
    pub fn render_log(class: LogClass, message: &str) -> String {
        match class.prefix() {
            Some(prefix) => format!("{prefix} {message}"),
            None => message.to_string(),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LauncherEvent);
}

/// The launcher's own window, hidden while the game runs.
pub trait HostWindow: Send + Sync {
    fn show(&self);
    fn hide(&self);
}
