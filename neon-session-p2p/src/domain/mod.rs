mod connection;
mod ice_server;
mod session;

pub use connection::{Connection, Direction};
pub use ice_server::IceServer;
pub use session::SessionId;
