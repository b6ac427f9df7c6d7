//! Channel session - per-connection state machine
//!
//! `Open → Receiving → Closed`. Each inbound message is handled to completion
//! before the transport reads the next one. Only a failed write back to the
//! client is returned as an error; everything else is logged here and the
//! channel stays open.

use super::annotation::extract_identity;
use super::endpoint::Endpoint;
use super::request::{BuildAck, BuildRequest, StopAck, StopRequest};
use crate::channel::{ChannelHandle, ChannelId};
use crate::runner::KodeRunner;
use koderunner_foundation::{markup, Error, Result};
use koderunner_task::{OutputEvent, SessionTable};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Receiving,
    Closed,
}

/// Why a channel is being closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Close frame from the client, or the stream ended
    Client,

    /// Transport error; runnables are reloaded afterwards
    Fault(String),
}

pub struct ChannelSession {
    runner: Arc<KodeRunner>,
    handle: ChannelHandle,
    state: ChannelState,
    /// Output mirror of `/terminput` channels
    mirror: Option<JoinHandle<()>>,
}

impl ChannelSession {
    /// Start tracking `handle` in the hub
    pub fn open(runner: Arc<KodeRunner>, handle: ChannelHandle) -> Self {
        runner.hub().attach(handle.clone());

        let mirror = (handle.endpoint() == Endpoint::TermInput)
            .then(|| spawn_output_mirror(runner.sessions(), handle.clone()));

        info!("Channel {} opened on {}", handle.id(), handle.endpoint());

        Self {
            runner,
            handle,
            state: ChannelState::Open,
            mirror,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.handle.id()
    }

    pub fn endpoint(&self) -> Endpoint {
        self.handle.endpoint()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }

    /// Process one inbound text message
    pub async fn handle_text(&mut self, text: &str) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Err(Error::ChannelIo(format!("channel {} is closed", self.id())));
        }
        self.state = ChannelState::Receiving;

        match self.endpoint() {
            Endpoint::Code => self.submit_source(text).await,
            Endpoint::Pms => self.build(text).await,
            Endpoint::TermInput => {
                self.forward_input(text).await;
                Ok(())
            }
            Endpoint::Stop => self.stop(text),
        }
    }

    /// Close handshake, stop tracking, reload runnables after a fault
    pub async fn close(&mut self, reason: CloseReason) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.state = ChannelState::Closed;

        if let Some(mirror) = self.mirror.take() {
            mirror.abort();
        }
        self.runner.hub().detach(self.id());
        self.handle.close();

        match reason {
            CloseReason::Client => info!("Channel {} on {} closed", self.id(), self.endpoint()),
            CloseReason::Fault(message) => {
                warn!(
                    "Channel {} on {} failed: {}",
                    self.id(),
                    self.endpoint(),
                    message
                );
                self.runner.reload_runnables().await;
            }
        }
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    async fn submit_source(&self, text: &str) -> Result<()> {
        let Some(identity) = extract_identity(text) else {
            debug!("No File_name/Project annotations, message ignored");
            return Ok(());
        };

        let project_dir = self.runner.config().project_dir(&identity.project);
        let file_path = project_dir.join(&identity.file_name);

        if let Err(e) = write_source(&file_path, text).await {
            error!("Failed to save {}: {}", file_path.display(), e);
            return Ok(());
        }
        info!("File saved to {}", file_path.display());

        self.reply(format!(
            "File: {} saved to {}",
            identity.file_name,
            project_dir.display()
        ))
    }

    async fn build(&self, text: &str) -> Result<()> {
        let settings = match BuildRequest::parse(text)
            .and_then(|request| request.to_settings(self.runner.config()))
        {
            Ok(settings) => settings.with_back_channel(self.handle.clone()),
            Err(e) => {
                warn!("Dropping build request on channel {}: {}", self.id(), e);
                return Ok(());
            }
        };

        info!(
            project = %settings.project_name,
            build_system = %settings.language,
            run_on_build = settings.run_on_build,
            "Build request"
        );

        let ack = match self
            .runner
            .dispatcher()
            .dispatch(&settings.language, &settings)
            .await
        {
            Ok(()) => BuildAck::completed(&settings),
            Err(e) => {
                error!("Build of {} failed: {}", settings.project_name, e);
                BuildAck::error(&e)
            }
        };

        self.reply(ack.to_json())
    }

    async fn forward_input(&self, text: &str) {
        if !self.runner.sessions().send_input(text).await {
            debug!("No live session accepted input from channel {}", self.id());
        }
    }

    fn stop(&self, text: &str) -> Result<()> {
        match StopRequest::parse(text) {
            Ok(StopRequest { stopped: true }) => {
                let report = self.runner.sessions().kill_all();
                info!(
                    killed = report.killed.len(),
                    failed = report.failed.len(),
                    "Stop requested"
                );
                self.reply(StopAck::default().to_json())
            }
            Ok(_) => {
                debug!("Stop request with stopped=false ignored");
                Ok(())
            }
            Err(e) => {
                warn!("Dropping stop request on channel {}: {}", self.id(), e);
                Ok(())
            }
        }
    }

    fn reply(&self, text: impl Into<String>) -> Result<()> {
        if self.handle.send_text(text) {
            Ok(())
        } else {
            Err(Error::ChannelIo(format!(
                "channel {} transport is gone",
                self.id()
            )))
        }
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        if let Some(mirror) = self.mirror.take() {
            mirror.abort();
        }
        if self.state != ChannelState::Closed {
            self.runner.hub().detach(self.id());
        }
    }
}

async fn write_source(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await
}

/// Stream every session's output, as markup, to `handle`
fn spawn_output_mirror(sessions: &Arc<SessionTable>, handle: ChannelHandle) -> JoinHandle<()> {
    let mut bus = sessions.subscribe_output();
    tokio::spawn(async move {
        loop {
            match bus.recv().await {
                Ok(OutputEvent::Chunk { text, .. }) => {
                    if !handle.send_text(markup::translate(&text)) {
                        break;
                    }
                }
                Ok(OutputEvent::Exited { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Channel {} fell behind, {} output chunk(s) dropped",
                        handle.id(),
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
