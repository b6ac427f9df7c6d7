//! Session state machine

use serde::Serialize;

/// Lifecycle of a process session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Process is alive
    Running,

    /// Process exited on its own
    Exited(i32),

    /// Process was force-killed
    Killed(i32),
}

impl SessionState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Running)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    /// Exit code once the process is gone (`-1` when ended by a signal)
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SessionState::Running => None,
            SessionState::Exited(code) | SessionState::Killed(code) => Some(*code),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Running => "Running",
            SessionState::Exited(_) => "Exited",
            SessionState::Killed(_) => "Killed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_code() {
            Some(code) => write!(f, "{} ({})", self.display_name(), code),
            None => write!(f, "{}", self.display_name()),
        }
    }
}
