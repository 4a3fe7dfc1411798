use instant::Instant;
use neon_session_core::PeerId;

/// Who opened the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// We connected to them (guest to host)
    Outbound,
    /// They showed up on our side
    Inbound,
}

/// One open channel to a remote peer
#[derive(Debug, Clone)]
pub struct Connection {
    pub peer: PeerId,
    pub direction: Direction,
    pub opened_at: Instant,
    /// Last time any payload arrived from this peer
    pub last_seen: Instant,
    pub messages_in: u64,
    pub messages_out: u64,
}

impl Connection {
    pub fn new(peer: PeerId, direction: Direction) -> Self {
        let now = Instant::now();
        Self {
            peer,
            direction,
            opened_at: now,
            last_seen: now,
            messages_in: 0,
            messages_out: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
        self.messages_in += 1;
    }
}
