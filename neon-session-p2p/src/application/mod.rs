mod config;
mod events;
mod lifecycle;
mod lobby;
mod registry;
mod router;
pub mod runtime;
mod session;
pub mod sync;

pub use config::{
    SessionConfig, DEFAULT_SIGNALLING_SERVER, ENV_ROOM, ENV_SIGNALLING_URL, ENV_TICK_HZ,
};
pub use events::{ConnectionEvent, SessionEvent};
pub use lifecycle::TeardownHandle;
pub use lobby::LobbyCoordinator;
pub use registry::ConnectionRegistry;
pub use router::{Inbound, MessageRouter, SubscriptionId};
pub use session::NetSession;
pub use sync::{SyncLoop, TickReport};
