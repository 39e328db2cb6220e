// In-memory stand-ins for the network, the identity provider, the game
// process and the webview.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, Notify};

use crate::core::auth::{AuthSession, IdentityProvider};
use crate::core::downloader::{ContentTransport, RemoteBody};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, HostWindow, LauncherEvent, ProgressEvent};
use crate::core::launch::{GameProcess, GameSpawner, LaunchParams};

// ── Transport ──

enum Served {
    Body(Vec<u8>),
    Text(String),
    Stalled,
}

/// Serves registered URLs; anything else is a 404. Bodies arrive in three chunks.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Served>>,
    opens: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: Vec<u8>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Served::Body(body));
    }

    pub fn serve_text(&self, url: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Served::Text(body.to_string()));
    }

    /// The request succeeds but no byte ever arrives.
    pub fn serve_stalled(&self, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Served::Stalled);
    }

    /// Total requests of either kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn opens_of(&self, url: &str) -> usize {
        self.opens.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn not_found(url: &str) -> LauncherError {
        LauncherError::DownloadFailed {
            url: url.to_string(),
            status: 404,
        }
    }
}

#[async_trait]
impl ContentTransport for FakeTransport {
    async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = match self.routes.lock().unwrap().get(url) {
            Some(Served::Text(text)) => Some(text.clone()),
            Some(Served::Body(body)) => Some(String::from_utf8_lossy(body).to_string()),
            Some(Served::Stalled) => None,
            None => return Err(Self::not_found(url)),
        };
        match text {
            Some(text) => Ok(text),
            None => std::future::pending().await,
        }
    }

    async fn open(&self, url: &str) -> LauncherResult<RemoteBody> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .opens
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let body = match self.routes.lock().unwrap().get(url) {
            Some(Served::Body(body)) => body.clone(),
            Some(Served::Text(text)) => text.clone().into_bytes(),
            Some(Served::Stalled) => {
                return Ok(RemoteBody {
                    content_length: None,
                    chunks: futures_util::stream::pending().boxed(),
                })
            }
            None => return Err(Self::not_found(url)),
        };

        let size = body.len().div_ceil(3).max(1);
        let chunks: Vec<LauncherResult<Bytes>> = body
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(RemoteBody {
            content_length: Some(body.len() as u64),
            chunks: futures_util::stream::iter(chunks).boxed(),
        })
    }
}

// ── Identity provider ──

#[derive(Default)]
enum LoginScript {
    #[default]
    Cancel,
    Succeed(AuthSession),
    Fail,
}

/// Lets a test hold an interactive login open.
#[derive(Default)]
pub struct Gate {
    arrived: Notify,
    opened: Notify,
}

impl Gate {
    pub async fn entered(&self) {
        self.arrived.notified().await;
    }

    pub fn release(&self) {
        self.opened.notify_one();
    }
}

/// Refresh fails and login is cancelled unless scripted otherwise.
#[derive(Default)]
pub struct FakeProvider {
    refresh: Mutex<Option<AuthSession>>,
    login: Mutex<LoginScript>,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl FakeProvider {
    pub fn set_refresh(&self, session: Option<AuthSession>) {
        *self.refresh.lock().unwrap() = session;
    }

    pub fn set_login(&self, session: Option<AuthSession>) {
        *self.login.lock().unwrap() = match session {
            Some(session) => LoginScript::Succeed(session),
            None => LoginScript::Cancel,
        };
    }

    pub fn fail_login(&self) {
        *self.login.lock().unwrap() = LoginScript::Fail;
    }

    /// The next login blocks until the returned gate is released.
    pub fn hold_login(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn refresh(&self, _previous: Option<&AuthSession>) -> LauncherResult<AuthSession> {
        self.refresh
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| LauncherError::Auth("refresh rejected".into()))
    }

    async fn login(&self) -> LauncherResult<Option<AuthSession>> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.arrived.notify_one();
            gate.opened.notified().await;
        }

        match &*self.login.lock().unwrap() {
            LoginScript::Cancel => Ok(None),
            LoginScript::Succeed(session) => Ok(Some(session.clone())),
            LoginScript::Fail => Err(LauncherError::Auth("provider unavailable".into())),
        }
    }
}

// ── Presentation ──

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LauncherEvent>>,
}

impl RecordingSink {
    pub fn rendered_logs(&self) -> Vec<String> {
        self.logs_where(|_| true)
    }

    pub fn error_logs(&self) -> Vec<String> {
        self.logs_where(|class| class.is_error())
    }

    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                LauncherEvent::Progress(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn game_closed(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, LauncherEvent::GameClosed))
            .count()
    }

    fn logs_where(&self, keep: impl Fn(crate::core::events::LogClass) -> bool) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                LauncherEvent::Log { class, message } if keep(*class) => {
                    Some(LauncherEvent::render_log(*class, message))
                }
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LauncherEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingWindow {
    hides: AtomicUsize,
    shows: AtomicUsize,
}

impl RecordingWindow {
    pub fn hides(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }

    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }
}

impl HostWindow for RecordingWindow {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Game process ──

struct Script {
    lines: Vec<String>,
    exit: Option<i32>,
    hold: Option<oneshot::Receiver<()>>,
}

/// Plays back scripted runs in order. Without a script the game exits
/// silently with code 0.
#[derive(Default)]
pub struct FakeSpawner {
    scripts: Mutex<VecDeque<Script>>,
    fail: AtomicBool,
    spawns: AtomicUsize,
    observer: Mutex<Option<Arc<RecordingSink>>>,
    progress_at_spawn: Mutex<Option<usize>>,
}

impl FakeSpawner {
    pub fn script(&self, lines: &[&str], exit: Option<i32>) {
        self.push(lines, exit, None);
    }

    /// Output stays open until the returned sender fires.
    pub fn script_held(&self, lines: &[&str], exit: Option<i32>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(lines, exit, Some(rx));
        tx
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Record how many progress events `sink` had seen at spawn time.
    pub fn observe(&self, sink: Arc<RecordingSink>) {
        *self.observer.lock().unwrap() = Some(sink);
    }

    pub fn progress_at_spawn(&self) -> Option<usize> {
        *self.progress_at_spawn.lock().unwrap()
    }

    fn push(&self, lines: &[&str], exit: Option<i32>, hold: Option<oneshot::Receiver<()>>) {
        self.scripts.lock().unwrap().push_back(Script {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            exit,
            hold,
        });
    }
}

#[async_trait]
impl GameSpawner for FakeSpawner {
    async fn spawn(&self, _params: &LaunchParams) -> LauncherResult<GameProcess> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.observer.lock().unwrap().as_ref() {
            *self.progress_at_spawn.lock().unwrap() = Some(sink.progress().len());
        }
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(LauncherError::Spawn("java: not found".into()));
        }

        let script = self.scripts.lock().unwrap().pop_front().unwrap_or(Script {
            lines: Vec::new(),
            exit: Some(0),
            hold: None,
        });

        let (line_tx, line_rx) = mpsc::channel(16);
        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            for line in script.lines {
                let _ = line_tx.send(line).await;
            }
            if let Some(hold) = script.hold {
                let _ = hold.await;
            }
            drop(line_tx);
            let _ = exit_tx.send(script.exit);
        });

        Ok(GameProcess {
            pid: Some(4242),
            output: line_rx,
            exit: exit_rx,
        })
    }
}
