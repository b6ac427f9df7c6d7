//! Session output events
//!
//! Every spawned process publishes its stdout/stderr as chunks, as soon as
//! the bytes arrive, followed by exactly one `Exited` event.

use crate::session::SessionId;
use serde::Serialize;

/// Broadcast channel capacity (per session and for the table-wide bus)
pub(crate) const BROADCAST_CAPACITY: usize = 1024;

/// Which pipe a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// A single output event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    /// Text read from one of the pipes
    Chunk {
        session: SessionId,
        stream: OutputStream,
        text: String,
    },

    /// The process is gone; no more chunks follow for this session
    Exited { session: SessionId, code: i32 },
}

impl OutputEvent {
    pub fn session(&self) -> SessionId {
        match self {
            OutputEvent::Chunk { session, .. } | OutputEvent::Exited { session, .. } => *session,
        }
    }

    /// Chunk text, `None` for the exit event
    pub fn text(&self) -> Option<&str> {
        match self {
            OutputEvent::Chunk { text, .. } => Some(text),
            OutputEvent::Exited { .. } => None,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, OutputEvent::Exited { .. })
    }
}

/// Incremental UTF-8 decoder for pipe reads.
///
/// A multi-byte character split across two reads is held back until the rest
/// arrives; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, get every complete character decoded so far
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // incomplete sequence at the end
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is left once the pipe hits EOF
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
