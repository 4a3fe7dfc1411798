use neon_session_core::{LobbyError, PeerId, ProtocolError};

/// Errors surfaced by session actions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No local identity could be allocated; the action may be retried
    #[error("Transport initialization failed: {0}")]
    TransportInit(String),

    #[error("Could not connect to {peer}: {reason}")]
    Connect { peer: PeerId, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Lobby error: {0}")]
    Lobby(#[from] LobbyError),

    /// The session was torn down while the action was suspended
    #[error("Cancelled by teardown during {0}")]
    Cancelled(&'static str),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Transport is not open")]
    NotOpen,

    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
