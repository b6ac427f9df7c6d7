//! Session table - every live process the server started
//!
//! Shared by all channels. Sessions enter on spawn and leave on exit (or on
//! `kill_all`). The table also carries a bus that re-publishes the output of
//! every session, which is what terminal-input channels stream to clients.

use crate::output::{OutputEvent, BROADCAST_CAPACITY};
use crate::session::{ProcessSession, SessionCommand, SessionId, SpawnedSession};
use koderunner_foundation::{Result, ShellConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Outcome of [`SessionTable::kill_all`]
#[derive(Debug, Default)]
pub struct KillReport {
    pub killed: Vec<SessionId>,
    pub failed: Vec<(SessionId, String)>,
}

impl KillReport {
    pub fn total(&self) -> usize {
        self.killed.len() + self.failed.len()
    }
}

pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, Arc<ProcessSession>>>,
    bus: broadcast::Sender<OutputEvent>,
    seq: AtomicU64,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTable {
    pub fn new() -> Self {
        let (bus, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            sessions: RwLock::new(HashMap::new()),
            bus,
            seq: AtomicU64::new(0),
        }
    }

    /// Spawn a command and register it here
    pub fn spawn(self: &Arc<Self>, shell: &ShellConfig, command: SessionCommand) -> Result<SpawnedSession> {
        ProcessSession::spawn(self, shell, command)
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, session: Arc<ProcessSession>) {
        if let Some(stale) = self.sessions.write().insert(session.id(), session) {
            // pid reused before the old waiter got to remove its entry
            debug!("Replaced stale session entry {}", stale.id());
        }
    }

    /// Remove the entry for this exact session (not a newer one with the same pid)
    pub(crate) fn remove_session(&self, session: &ProcessSession) {
        let mut sessions = self.sessions.write();
        if sessions
            .get(&session.id())
            .is_some_and(|current| current.seq() == session.seq())
        {
            sessions.remove(&session.id());
        }
    }

    pub(crate) fn publish(&self, event: OutputEvent) {
        // no receivers is fine
        let _ = self.bus.send(event);
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<ProcessSession>> {
        self.sessions.write().remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<ProcessSession>> {
        self.sessions.read().get(&id).cloned()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions_by_age().iter().map(|s| s.id()).collect()
    }

    /// Live sessions, oldest first
    pub fn sessions_by_age(&self) -> Vec<Arc<ProcessSession>> {
        let mut sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        sessions.sort_by_key(|s| s.seq());
        sessions
    }

    /// Output of every session, from now on
    pub fn subscribe_output(&self) -> broadcast::Receiver<OutputEvent> {
        self.bus.subscribe()
    }

    /// Send a line to the most recently started session that still accepts
    /// input. Returns `false` when nobody took it.
    pub async fn send_input(&self, text: &str) -> bool {
        for session in self.sessions_by_age().into_iter().rev() {
            if session.send_input(text).await {
                debug!("Input routed to session {}", session.id());
                return true;
            }
        }
        false
    }

    pub async fn send_input_to(&self, id: SessionId, text: &str) -> bool {
        match self.get(id) {
            Some(session) => session.send_input(text).await,
            None => false,
        }
    }

    /// Force-kill every session. Failures are logged and reported; the table
    /// is empty afterwards regardless.
    pub fn kill_all(&self) -> KillReport {
        let drained: Vec<_> = {
            let mut sessions = self.sessions.write();
            sessions.drain().map(|(_, s)| s).collect()
        };

        let mut report = KillReport::default();
        for session in drained {
            match session.kill() {
                Ok(()) => report.killed.push(session.id()),
                Err(e) => {
                    warn!("Failed to kill session {}: {}", session.id(), e);
                    report.failed.push((session.id(), e.to_string()));
                }
            }
        }

        if report.total() > 0 {
            info!(
                "Killed {} session(s), {} failed",
                report.killed.len(),
                report.failed.len()
            );
        }
        report
    }
}
