// ─── Launch Orchestrator ───
// auth → sync → spawn → relay, one attempt at a time.
//
// RunState transitions:
//   Idle → Launching        launch() claims the slot
//   Launching → Running     first line of game output
//   Running → ShuttingDown  process exited
//   ShuttingDown → Idle     window restored, `GameClosed` emitted
// Any failure before the spawn goes straight back to Idle.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::auth::AuthSessionManager;
use crate::core::config::ConfigStore;
use crate::core::error::{ErrorCategory, LauncherResult};
use crate::core::events::{EventSink, HostWindow, LauncherEvent, LogClass};
use crate::core::sync::VersionSyncEngine;

use super::params::LaunchParams;
use super::process::{GameProcess, GameSpawner};

const PROGRESS_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Launching,
    Running,
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Busy,
    NoSession,
    SyncFailed,
    SpawnFailed,
    Started,
}

/// Where the game lives and what runs it.
#[derive(Debug, Clone)]
pub struct LaunchLayout {
    pub java: PathBuf,
    pub root: PathBuf,
    pub loader_installer: PathBuf,
}

/// Relay task of one launch attempt. Disposed before the next attempt starts.
struct LaunchSubscription {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LaunchSubscription {
    fn dispose(self) {
        self.token.cancel();
        if !self.handle.is_finished() {
            warn!("Previous game relay still active, detaching it");
        }
    }
}

pub struct LaunchOrchestrator {
    auth: Arc<AuthSessionManager>,
    sync: Arc<VersionSyncEngine>,
    config: Arc<ConfigStore>,
    spawner: Arc<dyn GameSpawner>,
    events: Arc<dyn EventSink>,
    window: Arc<dyn HostWindow>,
    layout: LaunchLayout,
    state: watch::Sender<RunState>,
    subscription: tokio::sync::Mutex<Option<LaunchSubscription>>,
    attempt: Mutex<CancellationToken>,
}

impl LaunchOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth: Arc<AuthSessionManager>,
        sync: Arc<VersionSyncEngine>,
        config: Arc<ConfigStore>,
        spawner: Arc<dyn GameSpawner>,
        events: Arc<dyn EventSink>,
        window: Arc<dyn HostWindow>,
        layout: LaunchLayout,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            auth,
            sync,
            config,
            spawner,
            events,
            window,
            layout,
            state,
            subscription: tokio::sync::Mutex::new(None),
            attempt: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Aborts the sync or download of the current attempt, if any.
    pub fn cancel_launch(&self) {
        if self.state() == RunState::Launching {
            info!("Launch cancellation requested");
            self.attempt_token().cancel();
        }
    }

    pub async fn launch(self: &Arc<Self>) -> LaunchOutcome {
        let claimed = self.state.send_if_modified(|state| {
            if *state == RunState::Idle {
                *state = RunState::Launching;
                true
            } else {
                false
            }
        });
        if !claimed {
            self.log(LogClass::Warning, "The game is already starting or running.");
            return LaunchOutcome::Busy;
        }

        let mut slot = self.subscription.lock().await;
        if let Some(previous) = slot.take() {
            previous.dispose();
        }

        let cancel = CancellationToken::new();
        *self.attempt.lock().unwrap_or_else(|p| p.into_inner()) = cancel.clone();

        let session = match self.auth.ensure_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.log(LogClass::AuthError, "No account signed in.");
                return self.back_to_idle(LaunchOutcome::NoSession);
            }
            Err(e) => {
                self.log(LogClass::AuthError, e.to_string());
                return self.back_to_idle(LaunchOutcome::NoSession);
            }
        };

        if let Err(e) = self.reconcile_with_progress(&cancel).await {
            match e.category() {
                ErrorCategory::Cancelled => self.log(LogClass::Warning, "Launch cancelled."),
                category => {
                    error!("Sync failed ({:?}): {}", category, e);
                    self.log(LogClass::SyncError, e.to_string());
                }
            }
            return self.back_to_idle(LaunchOutcome::SyncFailed);
        }

        let config = self.config.load().await;
        let params = LaunchParams::compose(
            &self.layout.java,
            &self.layout.root,
            &self.layout.loader_installer,
            config.ram_allocation_gb,
            session,
        );

        self.log(LogClass::Info, "Launching...");
        let process = match self.spawner.spawn(&params).await {
            Ok(process) => process,
            Err(e) => {
                error!("Spawn failed: {}", e);
                self.log(LogClass::Fatal, e.to_string());
                return self.back_to_idle(LaunchOutcome::SpawnFailed);
            }
        };
        if let Some(pid) = process.pid {
            info!("Game started (PID {})", pid);
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(self.clone().relay(process, token.clone()));
        *slot = Some(LaunchSubscription { token, handle });
        LaunchOutcome::Started
    }

    /// Runs the sync while draining its progress, so every event has been
    /// relayed by the time this returns.
    async fn reconcile_with_progress(&self, cancel: &CancellationToken) -> LauncherResult<String> {
        let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);
        let engine = &self.sync;
        let sync = async move {
            let result = engine.reconcile(&tx, cancel).await;
            drop(tx);
            result
        };
        let relay = async {
            while let Some(event) = rx.recv().await {
                self.events.emit(LauncherEvent::Progress(event));
            }
        };

        let (result, ()) = tokio::join!(sync, relay);
        result
    }

    async fn relay(self: Arc<Self>, mut process: GameProcess, token: CancellationToken) {
        let mut running = false;
        loop {
            let line = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                line = process.output.recv() => line,
            };
            let Some(line) = line else { break };

            if !running {
                running = true;
                self.state.send_replace(RunState::Running);
                self.window.hide();
            }
            self.events.emit(LauncherEvent::log(LogClass::Game, line));
        }

        let code = process.exit.await.ok().flatten();
        self.state.send_replace(RunState::ShuttingDown);
        self.window.show();
        match code {
            Some(code) => self.log(LogClass::Info, format!("Game closed (exit code {code}).")),
            None => self.log(LogClass::Info, "Game closed."),
        }
        self.events.emit(LauncherEvent::GameClosed);
        self.state.send_replace(RunState::Idle);
    }

    fn back_to_idle(&self, outcome: LaunchOutcome) -> LaunchOutcome {
        self.state.send_replace(RunState::Idle);
        outcome
    }

    fn attempt_token(&self) -> CancellationToken {
        self.attempt
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn log(&self, class: LogClass, message: impl Into<String>) {
        self.events.emit(LauncherEvent::log(class, message));
    }
}
