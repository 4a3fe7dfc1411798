use serde::{Deserialize, Serialize};

/// ICE server configuration for WebRTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs (can have multiple for failover)
    pub urls: Vec<String>,
    /// Username for authentication (required for TURN)
    pub username: Option<String>,
    /// Credential for authentication (required for TURN)
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            urls: vec![url.into()],
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }

    pub fn is_turn(&self) -> bool {
        self.username.is_some()
    }

    /// Public Google STUN servers
    pub fn default_stun_servers() -> Vec<Self> {
        vec![
            Self::stun("stun:stun.l.google.com:19302"),
            Self::stun("stun:stun1.l.google.com:19302"),
        ]
    }

    /// Collapse several servers into the single entry matchbox accepts.
    ///
    /// All URLs are kept in order; credentials come from the first server
    /// that carries them.
    pub fn merged(servers: &[IceServer]) -> Option<IceServer> {
        if servers.is_empty() {
            return None;
        }

        let urls = servers.iter().flat_map(|s| s.urls.iter().cloned()).collect();
        let auth = servers.iter().find(|s| s.is_turn());

        Some(IceServer {
            urls,
            username: auth.and_then(|s| s.username.clone()),
            credential: auth.and_then(|s| s.credential.clone()),
        })
    }
}
