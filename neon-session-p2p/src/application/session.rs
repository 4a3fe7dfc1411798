use crate::application::lifecycle::{EpochGuard, TeardownHandle};
use crate::application::sync::{self, SyncLoop, TickReport};
use crate::application::{
    Inbound, LobbyCoordinator, MessageRouter, SessionConfig, SessionEvent, SubscriptionId,
};
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::Transport;
use instant::Instant;
use neon_session_core::{
    AuthoritativeSnapshot, GameStateConsumer, InputFrame, LiteSnapshot, LobbyError, LobbyPhase,
    LobbyState, MessageTag, PeerId, ProjectileSpawn, Role, SyncMessage, Timestamp,
};

/// One peer's multiplayer session: transport, lobby and sync loop together.
///
/// Single-threaded. Drive it by calling [`NetSession::poll`] for network
/// and lobby traffic and [`NetSession::sync`] once per game frame, or both
/// at once with [`NetSession::tick`].
pub struct NetSession<T: Transport> {
    config: SessionConfig,
    router: MessageRouter<T>,
    lobby: LobbyCoordinator,
    sync: SyncLoop,
    teardown: TeardownHandle,
    /// Epoch the current state belongs to
    settled_epoch: u64,
}

impl<T: Transport> NetSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let teardown = TeardownHandle::new();
        Self {
            router: MessageRouter::new(transport),
            lobby: LobbyCoordinator::new(config.start_delay),
            sync: SyncLoop::new(&config),
            settled_epoch: teardown.epoch(),
            teardown,
            config,
        }
    }

    // ===== Getters =====

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn lobby(&self) -> &LobbyState {
        self.lobby.state()
    }

    pub fn phase(&self) -> LobbyPhase {
        self.lobby.state().phase()
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.lobby.state().my_id()
    }

    pub fn role(&self) -> Option<Role> {
        self.lobby.state().role()
    }

    pub fn router(&self) -> &MessageRouter<T> {
        &self.router
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.router.registry().open_peers()
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.teardown.clone()
    }

    pub fn sync_loop(&self) -> &SyncLoop {
        &self.sync
    }

    // ===== Lifecycle =====

    /// Open the transport as host and enter the lobby alone
    pub async fn host(&mut self) -> Result<PeerId> {
        self.settle_pending_teardown();
        self.lobby.begin_host()?;

        let guard = self.teardown.guard();
        let opened = self.router.transport_mut().open(Role::Host).await;
        let my_id = self.resume(&guard, "host", opened)?;

        self.lobby.hosted(my_id.clone())?;
        Ok(my_id)
    }

    /// Open the transport as guest, connect to `remote` and ask to join
    pub async fn join(
        &mut self,
        remote: PeerId,
        display_name: impl Into<String>,
    ) -> Result<PeerId> {
        self.settle_pending_teardown();
        self.lobby.begin_join(remote.clone())?;

        let guard = self.teardown.guard();
        let opened = self.router.transport_mut().open(Role::Guest).await;
        let my_id = self.resume(&guard, "join", opened)?;

        let connected = self.router.transport_mut().connect(&remote).await;
        self.resume(&guard, "connect", connected)?;

        self.router.register_outbound(remote);
        self.lobby
            .joined(&mut self.router, my_id.clone(), display_name.into())?;
        Ok(my_id)
    }

    /// Close every connection, clear all per-peer state and return to `Idle`
    pub fn teardown(&mut self) {
        self.teardown.teardown();
        self.shutdown();
    }

    /// Re-check the epoch after a suspension point.
    ///
    /// Results that land after a teardown are discarded and whatever the
    /// action opened is closed. Failures return the lobby to `Idle`.
    fn resume<R>(
        &mut self,
        guard: &EpochGuard,
        stage: &'static str,
        result: Result<R>,
    ) -> Result<R> {
        if let Err(cancelled) = guard.check(stage) {
            tracing::info!("Discarding {} result after teardown", stage);
            self.shutdown();
            return Err(cancelled);
        }

        result.map_err(|e| {
            tracing::warn!("{} failed: {}", stage, e);
            self.router.close_all();
            self.lobby.abort();
            e
        })
    }

    fn settle_pending_teardown(&mut self) -> bool {
        if self.teardown.epoch() == self.settled_epoch {
            return false;
        }
        self.shutdown();
        true
    }

    fn shutdown(&mut self) {
        self.router.close_all();
        self.lobby.reset();
        self.sync.reset();
        self.settled_epoch = self.teardown.epoch();
        tracing::info!("Session torn down");
    }

    // ===== Lobby actions =====

    pub fn set_ready(&mut self, ready: bool) -> Result<()> {
        self.lobby.set_ready(&mut self.router, ready)
    }

    pub fn toggle_ready(&mut self) -> Result<bool> {
        self.lobby.toggle_ready(&mut self.router)
    }

    pub fn select_class(&mut self, class_id: impl Into<String>) -> Result<()> {
        self.lobby.select_class(&mut self.router, class_id.into())
    }

    pub fn start_game(&mut self) -> Result<Timestamp> {
        self.lobby.start_game(&mut self.router)
    }

    pub fn select_upgrade(&mut self, upgrade_id: impl Into<String>) -> Result<usize> {
        let identity = self.identity()?;
        Ok(self.router.broadcast(&SyncMessage::UpgradeSelect {
            identity,
            upgrade_id: upgrade_id.into(),
        }))
    }

    pub fn enter_module(&mut self) -> Result<usize> {
        let identity = self.identity()?;
        Ok(self.router.broadcast(&SyncMessage::ModuleEnter { identity }))
    }

    pub fn exit_module(&mut self) -> Result<usize> {
        let identity = self.identity()?;
        Ok(self.router.broadcast(&SyncMessage::ModuleExit { identity }))
    }

    fn identity(&self) -> Result<PeerId> {
        self.local_id()
            .cloned()
            .ok_or(SessionError::Lobby(LobbyError::NoIdentity))
    }

    // ===== Observers =====

    pub fn subscribe(
        &mut self,
        tag: MessageTag,
        handler: impl FnMut(&PeerId, &SyncMessage) + 'static,
    ) -> SubscriptionId {
        self.router.subscribe(tag, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.router.unsubscribe(id)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.lobby.drain_events()
    }

    // ===== Driving =====

    /// Handle network events and lobby messages; gameplay messages are
    /// buffered for the next [`NetSession::sync`]. Returns the number of
    /// inbound items processed.
    pub fn poll(&mut self) -> usize {
        if self.settle_pending_teardown() {
            return 0;
        }

        let inbound = self.router.poll();
        let processed = inbound.len();

        for item in inbound {
            match item {
                Inbound::PeerLeft(peer) => self.lobby.peer_left(&peer),
                Inbound::Message { from, message } => self.route(from, message),
            }
        }

        processed
    }

    fn route(&mut self, from: PeerId, message: SyncMessage) {
        if !self.lobby.accepts(&from, &message) {
            tracing::warn!("Dropped {} from {}: not permitted", message.tag(), from);
            return;
        }

        self.router.notify(&from, &message);

        if self.lobby.state().is_host() && message.is_relayed() {
            let relayed = self.router.broadcast_except(&from, &message);
            tracing::trace!("Relayed {} from {} to {} peers", message.tag(), from, relayed);
        }

        if self.lobby.handle(&mut self.router, &from, &message) {
            return;
        }

        self.sync.enqueue(from, message);
    }

    /// Apply buffered gameplay messages to `world` and run the due ticks
    pub fn sync<C>(&mut self, now: Instant, world: &mut C) -> TickReport
    where
        C: GameStateConsumer + ?Sized,
    {
        if self.settle_pending_teardown() {
            return TickReport::default();
        }
        self.sync
            .run(now, &mut self.router, self.lobby.state(), world)
    }

    /// [`NetSession::poll`] followed by [`NetSession::sync`]
    pub fn tick<C>(&mut self, now: Instant, world: &mut C) -> TickReport
    where
        C: GameStateConsumer + ?Sized,
    {
        self.poll();
        self.sync(now, world)
    }

    /// Guest only, in game only; otherwise a no-op returning 0
    pub fn send_input_to_host(&mut self, frame: InputFrame) -> usize {
        sync::send_input_to_host(&mut self.router, self.lobby.state(), frame)
    }

    /// Host only; otherwise a no-op returning 0
    pub fn broadcast_state(&mut self, snapshot: AuthoritativeSnapshot) -> usize {
        sync::broadcast_state(&mut self.router, self.lobby.state(), snapshot)
    }

    pub fn broadcast_lite_state(&mut self, lite: LiteSnapshot) -> usize {
        sync::broadcast_lite_state(&mut self.router, self.lobby.state(), lite)
    }

    pub fn broadcast_projectile_spawn(&mut self, spawn: ProjectileSpawn) -> usize {
        sync::broadcast_projectile_spawn(&mut self.router, self.lobby.state(), spawn)
    }
}
