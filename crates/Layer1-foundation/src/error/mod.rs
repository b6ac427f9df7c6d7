//! Error types for KodeRunner
//!
//! Every crate in the workspace reports through this one enum.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// KodeRunner error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Dispatch
    // ========================================================================
    #[error("No runnable found for language: {0}")]
    NotFound(String),

    #[error("Runnable failed: {runnable} - {message}")]
    Runnable { runnable: String, message: String },

    // ========================================================================
    // Process sessions
    // ========================================================================
    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(String),

    #[error("Session error: {0}")]
    Session(String),

    // ========================================================================
    // Channels
    // ========================================================================
    #[error("Channel I/O failure: {0}")]
    ChannelIo(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // ========================================================================
    // Config
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that are reported back to the requesting channel
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::MalformedRequest(_)
                | Error::Runnable { .. }
                | Error::ProcessSpawn(_)
        )
    }

    /// Short stable identifier used in error acknowledgements
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Runnable { .. } => "runnable",
            Error::ProcessSpawn(_) => "process_spawn",
            Error::Session(_) => "session",
            Error::ChannelIo(_) => "channel_io",
            Error::MalformedRequest(_) => "malformed_request",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Internal(_) => "internal",
        }
    }

    /// Runnable failure helper
    pub fn runnable(runnable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Runnable {
            runnable: runnable.into(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
