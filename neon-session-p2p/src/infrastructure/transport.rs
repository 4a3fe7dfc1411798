use crate::application::ConnectionEvent;
use crate::infrastructure::error::Result;
use async_trait::async_trait;
use neon_session_core::{PeerId, Role};

/// Point-to-point channel provider (allows an in-memory stand-in for tests).
///
/// Delivery is ordered and reliable per connection; nothing is promised
/// across connections.
#[async_trait(?Send)]
pub trait Transport {
    /// Open the local endpoint and suspend until an identity is assigned
    async fn open(&mut self, role: Role) -> Result<PeerId>;

    /// Suspend until the channel to `remote` reports open
    async fn connect(&mut self, remote: &PeerId) -> Result<()>;

    fn local_peer_id(&self) -> Option<PeerId>;

    /// Best-effort, at-most-once
    fn send(&mut self, to: &PeerId, data: Vec<u8>) -> Result<()>;

    /// Connection changes and payloads observed since the last call
    fn poll_events(&mut self) -> Vec<ConnectionEvent>;

    fn disconnect(&mut self, peer: &PeerId);

    /// Close every channel and release the local identity
    fn close(&mut self);
}
