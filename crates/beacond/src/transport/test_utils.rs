//! Test helpers for the transport module.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use super::{ConnectionHandler, ConnectionStream};

/// Handler that records the peer of every accepted connection and drops it.
#[derive(Default)]
pub(crate) struct PeerRecordingHandler {
    peers: Mutex<Vec<Option<SocketAddr>>>,
}

impl PeerRecordingHandler {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn accepted(&self) -> usize {
        self.peers.lock().map(|peers| peers.len()).unwrap_or_default()
    }
}

impl ConnectionHandler for PeerRecordingHandler {
    fn handle(&self, stream: ConnectionStream) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.push(stream.peer());
        }
    }
}
