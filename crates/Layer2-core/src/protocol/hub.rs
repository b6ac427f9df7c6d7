//! Channel hub - open channels per endpoint

use super::endpoint::Endpoint;
use crate::channel::{ChannelHandle, ChannelId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
pub struct ChannelHub {
    channels: RwLock<HashMap<Endpoint, Vec<ChannelHandle>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handle: ChannelHandle) {
        debug!("Channel {} attached to {}", handle.id(), handle.endpoint());
        self.channels
            .write()
            .entry(handle.endpoint())
            .or_default()
            .push(handle);
    }

    /// Returns `false` if the channel was not tracked
    pub fn detach(&self, id: ChannelId) -> bool {
        let mut channels = self.channels.write();
        for handles in channels.values_mut() {
            if let Some(pos) = handles.iter().position(|h| h.id() == id) {
                handles.remove(pos);
                debug!("Channel {} detached", id);
                return true;
            }
        }
        false
    }

    pub fn channels(&self, endpoint: Endpoint) -> Vec<ChannelHandle> {
        self.channels
            .read()
            .get(&endpoint)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.channels.read().get(&endpoint).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.channels.read().values().map(Vec::len).sum()
    }

    /// Send `text` to every open channel on `endpoint`. Channels whose
    /// transport is gone are dropped. Returns how many received it.
    pub fn broadcast(&self, endpoint: Endpoint, text: &str) -> usize {
        let mut channels = self.channels.write();
        let Some(handles) = channels.get_mut(&endpoint) else {
            return 0;
        };

        handles.retain(|h| h.send_text(text));
        handles.len()
    }

    /// Ask every transport to close. Channels stay tracked until their
    /// sessions close.
    pub fn close_all(&self) {
        for handle in self.channels.read().values().flatten() {
            handle.close();
        }
    }
}
