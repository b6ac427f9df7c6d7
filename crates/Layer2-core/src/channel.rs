//! Channel handles - the outbound side of a client connection
//!
//! The protocol never touches sockets. Each connection gets a `ChannelHandle`
//! backed by an unbounded queue; the transport drains the queue into the
//! socket. Handles are cheap to clone and can be stored as a build's
//! back-channel.

use crate::protocol::Endpoint;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message queued for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),

    /// Perform the close handshake and stop writing
    Close,
}

#[derive(Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    endpoint: Endpoint,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

impl ChannelHandle {
    /// New handle plus the queue the transport must drain
    pub fn new(endpoint: Endpoint) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ChannelId::new(),
            endpoint,
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Queue a text frame. Returns `false` once the transport has gone away.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.tx.send(Outbound::Text(text.into())).is_ok()
    }

    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
