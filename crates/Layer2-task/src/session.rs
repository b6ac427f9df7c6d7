//! Process sessions - one spawned shell command with live output
//!
//! A session owns:
//! - the child's stdin (line input from clients)
//! - a broadcast of stdout/stderr chunks
//! - a watch of its lifecycle state
//!
//! The child itself lives in a waiter task. As soon as the process exits the
//! waiter removes the session from its table and marks it finished, so table
//! membership always means "still running". It then drains the pipe readers
//! and publishes `Exited` as the last output event.

use crate::output::{OutputEvent, OutputStream, Utf8Chunker, BROADCAST_CAPACITY};
use crate::state::SessionState;
use crate::table::SessionTable;
use chrono::{DateTime, Utc};
use koderunner_foundation::{Error, Result, ShellConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Max time, shared by both pipe readers, to wait for output after the
/// process exited. Grandchildren that inherited the pipes can keep them open
/// indefinitely; readers still running afterwards are aborted.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const READ_BUFFER_SIZE: usize = 1024;

/// Max time a line write may block on a full stdin pipe
const INPUT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Session identifier (the OS process id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u32);

impl SessionId {
    pub fn from_pid(pid: u32) -> Self {
        Self(pid)
    }

    pub fn pid(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to run
#[derive(Debug, Clone)]
pub struct SessionCommand {
    /// Command line handed to the shell
    pub command: String,

    /// Working directory (inherits the server's when `None`)
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl SessionCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// A freshly spawned session plus an output receiver that was subscribed
/// before the readers started, so it sees every chunk.
#[derive(Debug)]
pub struct SpawnedSession {
    pub session: Arc<ProcessSession>,
    pub output: broadcast::Receiver<OutputEvent>,
}

/// A running (or finished) shell command
pub struct ProcessSession {
    id: SessionId,
    seq: u64,
    command: String,
    started_at: DateTime<Utc>,
    stdin: Mutex<Option<ChildStdin>>,
    output: broadcast::Sender<OutputEvent>,
    state: watch::Receiver<SessionState>,
    kill_switch: CancellationToken,
}

impl std::fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSession")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("state", &self.state())
            .finish()
    }
}

impl ProcessSession {
    /// Start `command` through the configured shell and register it in `table`.
    ///
    /// The session is in the table before this returns and leaves it as soon
    /// as the process has exited. Must be called from within a tokio runtime.
    pub fn spawn(
        table: &Arc<SessionTable>,
        shell: &ShellConfig,
        command: SessionCommand,
    ) -> Result<SpawnedSession> {
        let mut cmd = Command::new(&shell.program);
        cmd.arg(&shell.arg)
            .arg(&command.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        // own process group so a kill reaches everything the shell started
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            Error::ProcessSpawn(format!(
                "{} {} {:?}: {}",
                shell.program, shell.arg, command.command, e
            ))
        })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::ProcessSpawn("process has no id after spawn".into()))?;
        let id = SessionId::from_pid(pid);

        let (output_tx, output_rx) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Running);
        let kill_switch = CancellationToken::new();

        let session = Arc::new(ProcessSession {
            id,
            seq: table.next_seq(),
            command: command.command.clone(),
            started_at: Utc::now(),
            stdin: Mutex::new(child.stdin.take()),
            output: output_tx.clone(),
            state: state_rx,
            kill_switch: kill_switch.clone(),
        });

        table.insert(Arc::clone(&session));
        info!("Spawned session {}: {}", id, command.command);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(
                id,
                OutputStream::Stdout,
                stdout,
                output_tx.clone(),
                Arc::clone(table),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(
                id,
                OutputStream::Stderr,
                stderr,
                output_tx.clone(),
                Arc::clone(table),
            ));
        }

        let waiter_table = Arc::clone(table);
        let waiter_session = Arc::clone(&session);
        tokio::spawn(async move {
            let (status, killed) = tokio::select! {
                status = child.wait() => (status, false),
                _ = kill_switch.cancelled() => {
                    if let Err(e) = child.start_kill() {
                        debug!("start_kill on session {}: {}", id, e);
                    }
                    (child.wait().await, true)
                }
            };

            let code = match status {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    warn!("Failed to wait on session {}: {}", id, e);
                    -1
                }
            };

            // the process is gone: leave the table before the readers drain
            waiter_table.remove_session(&waiter_session);
            let state = if killed {
                SessionState::Killed(code)
            } else {
                SessionState::Exited(code)
            };
            let _ = state_tx.send(state);

            drain_readers(id, readers).await;

            let event = OutputEvent::Exited { session: id, code };
            let _ = output_tx.send(event.clone());
            waiter_table.publish(event);

            debug!("Session {} finished: {}", id, state);
        });

        Ok(SpawnedSession {
            session,
            output: output_rx,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Subscribe to output produced from now on
    pub fn subscribe(&self) -> broadcast::Receiver<OutputEvent> {
        self.output.subscribe()
    }

    /// Write one line to the process' stdin.
    ///
    /// Returns `false` when the process is gone or nothing took the line
    /// before `INPUT_WRITE_TIMEOUT`.
    pub async fn send_input(&self, text: &str) -> bool {
        if self.state().is_terminal() {
            return false;
        }

        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return false;
        };

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let written = tokio::time::timeout(INPUT_WRITE_TIMEOUT, async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        })
        .await;

        match written {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("stdin of session {} closed: {}", self.id, e);
                *guard = None;
                false
            }
            Err(_) => {
                warn!("Session {} is not reading its input, line dropped", self.id);
                false
            }
        }
    }

    /// Kill the process and everything it started.
    ///
    /// Returns once the signal is sent; use [`wait`](Self::wait) to observe
    /// the exit.
    pub fn kill(&self) -> Result<()> {
        if self.state().is_terminal() {
            return Ok(());
        }

        #[cfg(unix)]
        let group = kill_process_group(self.id.pid());
        #[cfg(not(unix))]
        let group: std::io::Result<()> = Ok(());

        self.kill_switch.cancel();

        group.map_err(|e| Error::Session(format!("Failed to kill session {}: {}", self.id, e)))
    }

    /// Wait for the process to exit and return its exit code (`-1` if it was
    /// ended by a signal). Output may still be draining; the `Exited` event
    /// marks its end.
    pub async fn wait(&self) -> Result<i32> {
        let mut state = self.state.clone();
        let finished = state
            .wait_for(SessionState::is_terminal)
            .await
            .map_err(|_| Error::Session(format!("session {} ended without an exit status", self.id)))?;

        Ok(finished.exit_code().unwrap_or(-1))
    }
}

/// Let the readers finish within one shared bound, then stop the ones still
/// attached to pipes held open by descendants. Returns only once every reader
/// task has ended, so no chunk can follow the exit event.
async fn drain_readers(id: SessionId, mut readers: Vec<JoinHandle<()>>) {
    let drained = tokio::time::timeout(
        READER_DRAIN_TIMEOUT,
        futures::future::join_all(readers.iter_mut()),
    )
    .await;
    if drained.is_ok() {
        return;
    }

    debug!("Output of session {} still open after exit, detaching", id);
    for reader in &readers {
        reader.abort();
    }
    for reader in readers {
        // cancelled or already finished
        let _ = reader.await;
    }
}

/// Pump one pipe into the session's and the table's broadcast
fn spawn_reader<R>(
    id: SessionId,
    stream: OutputStream,
    mut pipe: R,
    output: broadcast::Sender<OutputEvent>,
    table: Arc<SessionTable>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunker = Utf8Chunker::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        let emit = |text: String| {
            if text.is_empty() {
                return;
            }
            let event = OutputEvent::Chunk {
                session: id,
                stream,
                text,
            };
            let _ = output.send(event.clone());
            table.publish(event);
        };

        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => emit(chunker.push(&buf[..n])),
                Err(e) => {
                    debug!("{} of session {} failed: {}", stream.as_str(), id, e);
                    break;
                }
            }
        }

        emit(chunker.finish());
    })
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    // SAFETY: killpg only sends a signal; the group id is the child's pid
    // because it was spawned with process_group(0).
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        // group already gone
        Some(libc::ESRCH) => Ok(()),
        _ => Err(err),
    }
}
