use neon_session_core::{PeerId, Role, Timestamp};

/// Events emitted by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    MessageReceived { from: PeerId, data: Vec<u8> },
}

/// Lobby notifications for the game, drained with `NetSession::drain_events`
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    IdentityAssigned { peer: PeerId, role: Role },
    /// Host side: a guest asked to join
    PeerJoined { peer: PeerId, name: String },
    /// Guest side: the host admitted us
    JoinAccepted { peer_ids: Vec<PeerId> },
    ReadyChanged { peer: PeerId, ready: bool },
    ClassChanged { peer: PeerId, class_id: String },
    GameStarted { start_time: Timestamp },
    PeerLeft(PeerId),
    /// Guest side: the host's channel closed
    HostLost(PeerId),
}
