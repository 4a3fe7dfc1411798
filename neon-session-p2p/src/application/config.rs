use crate::domain::{IceServer, SessionId};
use crate::infrastructure::error::{Result, SessionError};
use instant::Duration;
use neon_session_core::DEFAULT_CORRECTION_THRESHOLD;

pub const DEFAULT_SIGNALLING_SERVER: &str = "wss://match.neon-survivor.dev";

/// Environment variables read by [`SessionConfig::from_env`]
pub const ENV_SIGNALLING_URL: &str = "NEON_SIGNALLING_URL";
pub const ENV_ROOM: &str = "NEON_ROOM";
pub const ENV_TICK_HZ: &str = "NEON_TICK_HZ";

/// Configuration for a P2P game session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Matchbox signalling server URL
    pub signalling_server: String,

    /// Signalling room; every peer of a session uses the same one
    pub room: SessionId,

    pub ice_servers: Vec<IceServer>,

    /// How long `open` waits for an identity
    pub open_timeout: Duration,

    /// How long `connect` waits for the channel to the host
    pub connect_timeout: Duration,

    /// Host snapshot rate, also the guest input rate
    pub state_tick_hz: u32,

    /// Lite snapshot rate; disabled when `None`
    pub lite_tick_hz: Option<u32>,

    /// Enemies included in a lite snapshot
    pub lite_enemy_limit: usize,

    /// Drift beyond which lite updates snap the local avatar
    pub correction_threshold: f32,

    /// Delay between the host pressing start and the shared start time
    pub start_delay: Duration,

    /// Sleep granularity while waiting on the transport
    pub poll_interval: Duration,

    /// Gameplay messages buffered between two sync calls
    pub inbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signalling_server: DEFAULT_SIGNALLING_SERVER.to_string(),
            room: SessionId::new(),
            ice_servers: IceServer::default_stun_servers(),
            open_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(15),
            state_tick_hz: 20,
            lite_tick_hz: None,
            lite_enemy_limit: 80,
            correction_threshold: DEFAULT_CORRECTION_THRESHOLD,
            start_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(10),
            inbox_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub fn new(signalling_server: impl Into<String>) -> Self {
        Self {
            signalling_server: signalling_server.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `NEON_SIGNALLING_URL`, `NEON_ROOM` and `NEON_TICK_HZ`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SIGNALLING_URL) {
            config.signalling_server = url;
        }
        if let Some(room) = lookup(ENV_ROOM) {
            config.room = SessionId::parse(&room)?;
        }
        if let Some(hz) = lookup(ENV_TICK_HZ) {
            let hz = hz
                .trim()
                .parse::<u32>()
                .map_err(|e| SessionError::Config(format!("{}={:?}: {}", ENV_TICK_HZ, hz, e)))?;
            config = config.with_state_tick_hz(hz);
        }

        Ok(config)
    }

    pub fn with_signalling_server(mut self, url: impl Into<String>) -> Self {
        self.signalling_server = url.into();
        self
    }

    pub fn with_room(mut self, room: SessionId) -> Self {
        self.room = room;
        self
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    /// Append a TURN relay to the configured ICE servers
    pub fn with_turn(
        mut self,
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        self.ice_servers
            .push(IceServer::turn(url, username, credential));
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Zero is clamped to 1 Hz
    pub fn with_state_tick_hz(mut self, hz: u32) -> Self {
        self.state_tick_hz = hz.max(1);
        self
    }

    pub fn with_lite_tick_hz(mut self, hz: Option<u32>) -> Self {
        self.lite_tick_hz = hz.map(|hz| hz.max(1));
        self
    }

    pub fn with_lite_enemy_limit(mut self, limit: usize) -> Self {
        self.lite_enemy_limit = limit;
        self
    }

    pub fn with_correction_threshold(mut self, threshold: f32) -> Self {
        self.correction_threshold = threshold;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity.max(1);
        self
    }

    /// Signalling URL for this session's room
    pub fn room_url(&self) -> String {
        format!("{}/{}", self.signalling_server.trim_end_matches('/'), self.room)
    }

    pub fn state_interval(&self) -> Duration {
        interval_for(self.state_tick_hz)
    }

    pub fn lite_interval(&self) -> Option<Duration> {
        self.lite_tick_hz.map(interval_for)
    }
}

fn interval_for(hz: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(hz.max(1)))
}
