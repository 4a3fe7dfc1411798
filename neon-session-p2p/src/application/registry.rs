use crate::domain::{Connection, Direction};
use neon_session_core::PeerId;
use std::collections::HashMap;

/// Sole owner of the open connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<PeerId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a channel we opened. Returns `false` if it was already known.
    pub fn register_outbound(&mut self, peer: PeerId) -> bool {
        self.register(peer, Direction::Outbound)
    }

    /// Record a channel opened from the remote side
    pub fn register_inbound(&mut self, peer: PeerId) -> bool {
        self.register(peer, Direction::Inbound)
    }

    fn register(&mut self, peer: PeerId, direction: Direction) -> bool {
        if self.connections.contains_key(&peer) {
            return false;
        }
        tracing::debug!("Registered {:?} connection to {}", direction, peer);
        self.connections
            .insert(peer.clone(), Connection::new(peer, direction));
        true
    }

    pub fn remove(&mut self, peer: &PeerId) -> Option<Connection> {
        self.connections.remove(peer)
    }

    pub fn is_open(&self, peer: &PeerId) -> bool {
        self.connections.contains_key(peer)
    }

    pub fn get(&self, peer: &PeerId) -> Option<&Connection> {
        self.connections.get(peer)
    }

    /// Open peers in a stable order
    pub fn open_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.connections.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Note inbound traffic from `peer`
    pub fn touch(&mut self, peer: &PeerId) {
        if let Some(connection) = self.connections.get_mut(peer) {
            connection.touch();
        }
    }

    pub fn record_sent(&mut self, peer: &PeerId) {
        if let Some(connection) = self.connections.get_mut(peer) {
            connection.messages_out += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }
}
