// ─── Game Process ───
// Installs the loader on first run, fetches what the profile needs, then
// spawns the JVM and turns its output into a line channel plus an exit
// signal.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::core::downloader::ContentTransport;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

use super::files::GameFiles;
use super::install::{ensure_base_version, LoaderInstall};
use super::params::LaunchParams;
use super::profile::GameProfile;

const OUTPUT_BUFFER: usize = 256;

/// A running game. `output` closes once both pipes reach EOF; `exit` fires
/// after the process has been reaped.
pub struct GameProcess {
    pub pid: Option<u32>,
    pub output: mpsc::Receiver<String>,
    pub exit: oneshot::Receiver<Option<i32>>,
}

#[async_trait]
pub trait GameSpawner: Send + Sync {
    async fn spawn(&self, params: &LaunchParams) -> LauncherResult<GameProcess>;
}

pub struct JavaGameSpawner {
    transport: Arc<dyn ContentTransport>,
    events: Arc<dyn EventSink>,
}

impl JavaGameSpawner {
    pub fn new(transport: Arc<dyn ContentTransport>, events: Arc<dyn EventSink>) -> Self {
        Self { transport, events }
    }

    /// Installed, merged and with every required file on disk.
    async fn prepare(&self, params: &LaunchParams) -> LauncherResult<GameProfile> {
        tokio::fs::create_dir_all(&params.root)
            .await
            .map_err(|e| LauncherError::io(&params.root, e))?;

        let installed = LoaderInstall {
            java: &params.java,
            root: &params.root,
            installer: &params.loader_installer,
            events: self.events.as_ref(),
        }
        .ensure_installed()
        .await?;
        ensure_base_version(self.transport.as_ref(), &params.root, &installed.minecraft).await?;

        let profile = GameProfile::load(&params.root, &installed.version).await?;
        GameFiles::new(self.transport.as_ref(), self.events.as_ref(), &params.root)
            .ensure(&profile)
            .await?;
        Ok(profile)
    }
}

#[async_trait]
impl GameSpawner for JavaGameSpawner {
    async fn spawn(&self, params: &LaunchParams) -> LauncherResult<GameProcess> {
        let profile = self.prepare(params).await?;
        let args = params.command_args(&profile);

        let mut cmd = Command::new(&params.java);
        cmd.args(&args)
            .current_dir(&params.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        configure_platform_spawn(&mut cmd);

        info!("Launching {} with Java: {:?}", profile.id, params.java);
        debug!("Command (copy/paste): {}", params.format_for_logs(&args));

        let mut child = cmd
            .spawn()
            .map_err(|e| LauncherError::Spawn(format!("{}: {}", params.java.display(), e)))?;
        let pid = child.id();

        let (line_tx, line_rx) = mpsc::channel(OUTPUT_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, line_tx.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, line_tx.clone(), "stderr"));
        }
        drop(line_tx);

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => {
                    info!("Game process exited with status: {:?}", status);
                    status.code()
                }
                Err(e) => {
                    warn!("Cannot wait for game process: {}", e);
                    None
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(GameProcess {
            pid,
            output: line_rx,
            exit: exit_rx,
        })
    }
}

/// Lines that are not valid UTF-8 are relayed lossily. Only EOF or a read
/// error ends the relay.
async fn forward_lines<R>(pipe: R, tx: mpsc::Sender<String>, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                debug!("[game][{}] {}", stream, line);
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Cannot read game {}: {}", stream, e);
                break;
            }
        }
    }
}

pub(super) fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);

        // Terminal variables inherited from the host make LWJGL treat the
        // child as a console session.
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
        cmd.env_remove("ConEmuANSI");
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}
