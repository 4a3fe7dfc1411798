use crate::application::{ConnectionEvent, SessionConfig};
use crate::domain::IceServer;
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::Transport;
use async_trait::async_trait;
use instant::{Duration, Instant};
use matchbox_socket::{
    ChannelConfig, PeerId as MatchboxPeerId, PeerState, RtcIceServerConfig, WebRtcSocket,
    WebRtcSocketBuilder,
};
use neon_session_core::{PeerId, Role};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// WebRTC transport over a matchbox signalling room
pub struct MatchboxTransport {
    room_url: String,
    ice_servers: Vec<IceServer>,
    open_timeout: Duration,
    connect_timeout: Duration,
    poll_interval: Duration,

    socket: Option<WebRtcSocket>,
    loop_task: Option<JoinHandle<()>>,
    local_id: Option<PeerId>,

    /// Open channels by textual id
    channels: HashMap<PeerId, MatchboxPeerId>,

    /// Peer changes seen while suspended in `open`/`connect`
    pending: Vec<ConnectionEvent>,
}

impl MatchboxTransport {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            room_url: config.room_url(),
            ice_servers: config.ice_servers.clone(),
            open_timeout: config.open_timeout,
            connect_timeout: config.connect_timeout,
            poll_interval: config.poll_interval,
            socket: None,
            loop_task: None,
            local_id: None,
            channels: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn room_url(&self) -> &str {
        &self.room_url
    }

    fn loop_finished(&self) -> bool {
        self.loop_task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Pull peer state changes off the socket into the channel map
    fn drain_peer_updates(&mut self) {
        let Some(socket) = self.socket.as_mut() else {
            return;
        };

        for (raw, state) in socket.update_peers() {
            let peer = peer_id(raw);
            match state {
                PeerState::Connected => {
                    tracing::info!("🟢 Channel open to {}", peer);
                    self.channels.insert(peer.clone(), raw);
                    self.pending.push(ConnectionEvent::PeerConnected(peer));
                }
                PeerState::Disconnected => {
                    tracing::info!("🔴 Channel closed to {}", peer);
                    self.channels.remove(&peer);
                    self.pending.push(ConnectionEvent::PeerDisconnected(peer));
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl Transport for MatchboxTransport {
    async fn open(&mut self, role: Role) -> Result<PeerId> {
        if self.socket.is_some() {
            self.close();
        }

        tracing::info!("Opening {} transport on {}", role, self.room_url);

        let mut builder = WebRtcSocketBuilder::new(self.room_url.as_str())
            .add_channel(ChannelConfig::reliable());
        if let Some(ice) = build_ice_server_config(&self.ice_servers) {
            tracing::debug!("Using {} ICE url(s)", ice.urls.len());
            builder = builder.ice_server(ice);
        }
        let (socket, loop_fut) = builder.build();

        let span = tracing::info_span!("matchbox::webrtc_loop", room = %self.room_url);
        self.loop_task = Some(tokio::spawn(
            async move {
                if let Err(e) = loop_fut.await {
                    tracing::warn!("Signalling loop ended: {:?}", e);
                }
            }
            .instrument(span),
        ));
        self.socket = Some(socket);

        let start = Instant::now();
        loop {
            self.drain_peer_updates();

            if let Some(raw) = self.socket.as_mut().and_then(|s| s.id()) {
                let id = peer_id(raw);
                tracing::info!("Assigned peer id {}", id);
                self.local_id = Some(id.clone());
                return Ok(id);
            }

            if self.loop_finished() {
                self.close();
                return Err(SessionError::TransportInit(format!(
                    "signalling connection to {} closed",
                    self.room_url
                )));
            }

            if start.elapsed() > self.open_timeout {
                self.close();
                return Err(SessionError::TransportInit(format!(
                    "timed out after {:?} waiting for a peer id",
                    self.open_timeout
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn connect(&mut self, remote: &PeerId) -> Result<()> {
        if self.socket.is_none() {
            return Err(SessionError::NotOpen);
        }

        let start = Instant::now();
        loop {
            self.drain_peer_updates();

            if self.channels.contains_key(remote) {
                return Ok(());
            }

            if self.loop_finished() {
                return Err(SessionError::Connect {
                    peer: remote.clone(),
                    reason: "signalling connection closed".to_string(),
                });
            }

            if start.elapsed() > self.connect_timeout {
                return Err(SessionError::Connect {
                    peer: remote.clone(),
                    reason: format!("no channel after {:?}", self.connect_timeout),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn local_peer_id(&self) -> Option<PeerId> {
        self.local_id.clone()
    }

    fn send(&mut self, to: &PeerId, data: Vec<u8>) -> Result<()> {
        let raw = *self
            .channels
            .get(to)
            .ok_or_else(|| SessionError::SendFailed(format!("no channel to {}", to)))?;
        let socket = self.socket.as_mut().ok_or(SessionError::NotOpen)?;

        tracing::trace!("Sending {} bytes to {}", data.len(), to);
        socket.channel_mut(0).send(data.into_boxed_slice(), raw);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<ConnectionEvent> {
        self.drain_peer_updates();
        let mut events = std::mem::take(&mut self.pending);

        if let Some(socket) = self.socket.as_mut() {
            for (raw, packet) in socket.channel_mut(0).receive() {
                events.push(ConnectionEvent::MessageReceived {
                    from: peer_id(raw),
                    data: packet.to_vec(),
                });
            }
        }

        events
    }

    fn disconnect(&mut self, peer: &PeerId) {
        // matchbox has no per-peer close; forgetting the channel stops sends
        if self.channels.remove(peer).is_some() {
            tracing::debug!("Dropped channel to {}", peer);
        }
    }

    fn close(&mut self) {
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
        if self.socket.take().is_some() {
            tracing::info!("Closed transport on {}", self.room_url);
        }
        self.local_id = None;
        self.channels.clear();
        self.pending.clear();
    }
}

impl Drop for MatchboxTransport {
    fn drop(&mut self) {
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
    }
}

fn peer_id(raw: MatchboxPeerId) -> PeerId {
    PeerId::new(raw.0.to_string())
}

/// Build the single ICE entry matchbox accepts
fn build_ice_server_config(ice_servers: &[IceServer]) -> Option<RtcIceServerConfig> {
    IceServer::merged(ice_servers).map(|server| RtcIceServerConfig {
        urls: server.urls,
        username: server.username,
        credential: server.credential,
    })
}
