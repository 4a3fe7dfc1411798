use neon_session_p2p::SessionError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Could not write schema to {path}: {source}")]
    SchemaWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Host {0} left the session")]
    HostLost(String),
}

impl CliError {
    pub fn schema_write(path: PathBuf, source: std::io::Error) -> Self {
        CliError::SchemaWrite { path, source }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
