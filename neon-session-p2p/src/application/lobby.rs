use crate::application::{MessageRouter, SessionEvent};
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::Transport;
use instant::Duration;
use neon_session_core::{
    AuthoritativeSnapshot, LobbyError, LobbyState, PeerId, Role, SyncMessage, Timestamp,
};
use std::collections::VecDeque;

/// Drives the lobby handshake and owns the lobby state
#[derive(Debug)]
pub struct LobbyCoordinator {
    state: LobbyState,
    events: VecDeque<SessionEvent>,
    start_delay: Duration,
}

impl LobbyCoordinator {
    pub fn new(start_delay: Duration) -> Self {
        Self {
            state: LobbyState::new(),
            events: VecDeque::new(),
            start_delay,
        }
    }

    pub fn state(&self) -> &LobbyState {
        &self.state
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    fn my_id(&self) -> Result<PeerId> {
        self.state
            .my_id()
            .cloned()
            .ok_or(SessionError::Lobby(LobbyError::NoIdentity))
    }

    // ===== Host / join =====

    pub fn begin_host(&mut self) -> Result<()> {
        self.state.begin_hosting()?;
        Ok(())
    }

    /// Transport assigned our identity as host
    pub fn hosted(&mut self, my_id: PeerId) -> Result<()> {
        self.state.enter_lobby(my_id.clone())?;
        tracing::info!("🏠 Hosting as {}", my_id);
        self.events.push_back(SessionEvent::IdentityAssigned {
            peer: my_id,
            role: Role::Host,
        });
        Ok(())
    }

    pub fn begin_join(&mut self, host: PeerId) -> Result<()> {
        self.state.begin_joining(host)?;
        Ok(())
    }

    /// Channel to the host is open: enter the lobby and ask to be admitted
    pub fn joined<T: Transport>(
        &mut self,
        router: &mut MessageRouter<T>,
        my_id: PeerId,
        display_name: String,
    ) -> Result<()> {
        self.state.enter_lobby(my_id.clone())?;
        self.events.push_back(SessionEvent::IdentityAssigned {
            peer: my_id.clone(),
            role: Role::Guest,
        });

        if let Some(host) = self.state.host_id().cloned() {
            tracing::info!("🚪 {} joining host {} as '{}'", my_id, host, display_name);
            router.send_to(&host, &SyncMessage::JoinRequest { display_name });
        }
        Ok(())
    }

    /// A host or join attempt failed; allow a retry from `Idle`
    pub fn abort(&mut self) {
        self.state.reset();
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.events.clear();
    }

    // ===== Local actions =====

    pub fn set_ready<T: Transport>(
        &mut self,
        router: &mut MessageRouter<T>,
        ready: bool,
    ) -> Result<()> {
        let me = self.my_id()?;
        self.state.set_ready(me.clone(), ready);
        self.events.push_back(SessionEvent::ReadyChanged {
            peer: me.clone(),
            ready,
        });
        router.broadcast(&SyncMessage::ReadyStatus {
            identity: me,
            ready,
        });
        Ok(())
    }

    pub fn toggle_ready<T: Transport>(&mut self, router: &mut MessageRouter<T>) -> Result<bool> {
        let me = self.my_id()?;
        let ready = !self.state.ready_of(&me);
        self.set_ready(router, ready)?;
        Ok(ready)
    }

    pub fn select_class<T: Transport>(
        &mut self,
        router: &mut MessageRouter<T>,
        class_id: String,
    ) -> Result<()> {
        let me = self.my_id()?;
        self.state.set_class(me.clone(), class_id.clone());
        self.events.push_back(SessionEvent::ClassChanged {
            peer: me.clone(),
            class_id: class_id.clone(),
        });
        router.broadcast(&SyncMessage::ClassSelect {
            identity: me,
            class_id,
        });
        Ok(())
    }

    /// Host only. Not gated on everyone being ready.
    pub fn start_game<T: Transport>(&mut self, router: &mut MessageRouter<T>) -> Result<Timestamp> {
        self.state.begin_start()?;

        if !self.state.all_ready() {
            tracing::info!("Starting before every peer is ready");
        }

        let start_time = Timestamp::now().after(self.start_delay);
        let sent = router.broadcast(&SyncMessage::StartGame { start_time });
        self.state.enter_game(start_time)?;
        tracing::info!("🚀 Game starts at {} ({} peers notified)", start_time, sent);

        self.events
            .push_back(SessionEvent::GameStarted { start_time });
        Ok(start_time)
    }

    // ===== Inbound =====

    /// Whether a message from `from` may be acted on at all.
    ///
    /// A host takes anything but a join request only from admitted members,
    /// identity-scoped messages only from the identity itself and never
    /// host-authored ones. A guest takes host-authored messages only from its
    /// host and ignores join requests.
    pub fn accepts(&self, from: &PeerId, message: &SyncMessage) -> bool {
        match self.state.role() {
            None => false,
            Some(Role::Host) => {
                if matches!(message, SyncMessage::JoinRequest { .. }) {
                    return true;
                }
                if message.is_host_authored() || !self.state.is_member(from) {
                    return false;
                }
                message.identity().map_or(true, |identity| identity == from)
            }
            Some(Role::Guest) => {
                let from_host = self.state.host_id() == Some(from);
                if matches!(message, SyncMessage::JoinRequest { .. }) {
                    return false;
                }
                if message.is_host_authored() {
                    return from_host;
                }
                message
                    .identity()
                    .map_or(true, |identity| from_host || identity == from)
            }
        }
    }

    /// Apply a lobby message. Returns `false` for messages that belong elsewhere.
    pub fn handle<T: Transport>(
        &mut self,
        router: &mut MessageRouter<T>,
        from: &PeerId,
        message: &SyncMessage,
    ) -> bool {
        match message {
            SyncMessage::JoinRequest { display_name } => {
                if self.state.is_host() {
                    self.admit(router, from, display_name);
                }
                true
            }
            SyncMessage::JoinAccept { peer_ids, .. } => {
                self.state.mark_join_accepted();
                self.state.note_peers(peer_ids);
                tracing::info!("✅ Join accepted by {} ({} peers)", from, peer_ids.len());
                self.events.push_back(SessionEvent::JoinAccepted {
                    peer_ids: peer_ids.clone(),
                });
                true
            }
            SyncMessage::ReadyStatus { identity, ready } => {
                self.state.set_ready(identity.clone(), *ready);
                self.events.push_back(SessionEvent::ReadyChanged {
                    peer: identity.clone(),
                    ready: *ready,
                });
                true
            }
            SyncMessage::ClassSelect { identity, class_id } => {
                self.state.set_class(identity.clone(), class_id.clone());
                self.events.push_back(SessionEvent::ClassChanged {
                    peer: identity.clone(),
                    class_id: class_id.clone(),
                });
                true
            }
            SyncMessage::StartGame { start_time } => {
                match self.state.enter_game(*start_time) {
                    Ok(()) => {
                        tracing::info!("🚀 Host {} started the game at {}", from, start_time);
                        self.events.push_back(SessionEvent::GameStarted {
                            start_time: *start_time,
                        });
                    }
                    Err(e) => tracing::debug!("Ignoring start: {}", e),
                }
                true
            }
            _ => false,
        }
    }

    fn admit<T: Transport>(&mut self, router: &mut MessageRouter<T>, peer: &PeerId, name: &str) {
        self.state.add_member(peer.clone(), Some(name.to_string()));
        tracing::info!("👤 {} joined as '{}'", peer, name);
        self.events.push_back(SessionEvent::PeerJoined {
            peer: peer.clone(),
            name: name.to_string(),
        });

        router.send_to(
            peer,
            &SyncMessage::JoinAccept {
                state: AuthoritativeSnapshot::default(),
                peer_ids: self.state.roster(),
            },
        );

        if let Some(me) = self.state.my_id().cloned() {
            self.replay_choices(router, peer, me);
        }

        if let Some(start_time) = self.state.start_time() {
            router.send_to(peer, &SyncMessage::StartGame { start_time });
            tracing::info!("🚀 {} joined a running game", peer);
        }
    }

    fn replay_choices<T: Transport>(
        &self,
        router: &mut MessageRouter<T>,
        peer: &PeerId,
        me: PeerId,
    ) {
        if let Some(ready) = self.state.ready_flag(&me) {
            router.send_to(
                peer,
                &SyncMessage::ReadyStatus {
                    identity: me.clone(),
                    ready,
                },
            );
        }
        if let Some(class_id) = self.state.class_of(&me) {
            router.send_to(
                peer,
                &SyncMessage::ClassSelect {
                    identity: me,
                    class_id: class_id.to_string(),
                },
            );
        }
    }

    /// The channel to `peer` closed
    pub fn peer_left(&mut self, peer: &PeerId) {
        let was_host = !self.state.is_host() && self.state.host_id() == Some(peer);
        self.state.remove_member(peer);

        tracing::info!("👋 {} left", peer);
        self.events.push_back(SessionEvent::PeerLeft(peer.clone()));
        if was_host {
            tracing::warn!("Lost connection to host {}", peer);
            self.events.push_back(SessionEvent::HostLost(peer.clone()));
        }
    }
}
