// Domain layer (identities, connections, config values)
pub mod domain;

// Application layer (lobby handshake, routing, sync loop)
pub mod application;

// Infrastructure layer (transport adapters)
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    ConnectionEvent, ConnectionRegistry, Inbound, LobbyCoordinator, MessageRouter, NetSession,
    SessionConfig, SessionEvent, SubscriptionId, SyncLoop, TeardownHandle, TickReport,
};
pub use domain::{Connection, Direction, IceServer, SessionId};
pub use infrastructure::error::{Result, SessionError};
pub use infrastructure::{MatchboxTransport, Transport};
