use crate::application::runtime::{MessageQueue, Ticker};
use crate::application::{MessageRouter, SessionConfig};
use crate::infrastructure::Transport;
use instant::Instant;
use neon_session_core::{
    AuthoritativeSnapshot, GameStateConsumer, InputFrame, LiteSnapshot, LobbyPhase, LobbyState,
    MessageTag, PeerId, ProjectileSpawn, SyncMessage,
};

/// What one `run` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Buffered gameplay messages applied to the consumer
    pub applied: usize,
    pub states_sent: usize,
    pub lite_sent: usize,
    pub inputs_sent: usize,
}

/// In-game synchronization: authoritative broadcast on the host, input
/// upload on guests, and application of whatever arrived in between.
#[derive(Debug)]
pub struct SyncLoop {
    inbox: MessageQueue,
    state_ticker: Ticker,
    lite_ticker: Option<Ticker>,
    lite_enemy_limit: usize,
    correction_threshold: f32,
    dropped: u64,
}

impl SyncLoop {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            inbox: MessageQueue::new(config.inbox_capacity),
            state_ticker: Ticker::new(config.state_interval()),
            lite_ticker: config.lite_interval().map(Ticker::new),
            lite_enemy_limit: config.lite_enemy_limit,
            correction_threshold: config.correction_threshold,
            dropped: 0,
        }
    }

    /// Messages dropped because the inbox was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Buffer a gameplay message. Returns `false` if it is not one, or if the
    /// inbox is full.
    pub fn enqueue(&mut self, from: PeerId, message: SyncMessage) -> bool {
        if !matches!(
            message.tag(),
            MessageTag::StateUpdate
                | MessageTag::LiteStateUpdate
                | MessageTag::ProjectileSpawn
                | MessageTag::InputUpdate
        ) {
            return false;
        }

        match self.inbox.push(from, message) {
            Ok(()) => true,
            Err(e) => {
                self.dropped += 1;
                tracing::warn!("Dropping gameplay message: {}", e);
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.inbox.clear();
        self.state_ticker.reset();
        if let Some(ticker) = self.lite_ticker.as_mut() {
            ticker.reset();
        }
    }

    /// Apply buffered messages, then run whichever ticks are due at `now`
    pub fn run<T, C>(
        &mut self,
        now: Instant,
        router: &mut MessageRouter<T>,
        lobby: &LobbyState,
        world: &mut C,
    ) -> TickReport
    where
        T: Transport,
        C: GameStateConsumer + ?Sized,
    {
        let mut report = TickReport::default();
        let Some(my_id) = lobby.my_id() else {
            self.inbox.clear();
            return report;
        };
        let is_host = lobby.is_host();

        for (from, message) in self.inbox.drain() {
            match message {
                SyncMessage::StateUpdate(snapshot) if !is_host => {
                    world.apply_snapshot(snapshot, my_id);
                }
                SyncMessage::LiteStateUpdate(lite) if !is_host => {
                    world.apply_lite_snapshot(&lite, my_id, self.correction_threshold);
                }
                SyncMessage::ProjectileSpawn(spawn) if !is_host => {
                    world.spawn_projectile(&spawn);
                }
                SyncMessage::InputUpdate {
                    identity,
                    keys,
                    movement,
                    pointer,
                } if identity != *my_id => {
                    let frame = InputFrame {
                        keys,
                        movement,
                        pointer,
                    };
                    world.apply_remote_input(&identity, frame);
                }
                other => {
                    tracing::trace!("Skipped {} from {}", other.tag(), from);
                    continue;
                }
            }
            report.applied += 1;
        }

        if lobby.phase() != LobbyPhase::InGame {
            return report;
        }

        if is_host {
            if self.state_ticker.ready(now) {
                report.states_sent = router.broadcast(&SyncMessage::StateUpdate(world.snapshot()));
            }
            let limit = self.lite_enemy_limit;
            if let Some(ticker) = self.lite_ticker.as_mut() {
                if ticker.ready(now) {
                    let lite = world.lite_snapshot(limit);
                    report.lite_sent = router.broadcast(&SyncMessage::LiteStateUpdate(lite));
                }
            }
        } else if self.state_ticker.ready(now) {
            report.inputs_sent = send_input_to_host(router, lobby, world.local_input());
        }

        report
    }
}

/// Guest only, and only in game
pub fn send_input_to_host<T: Transport>(
    router: &mut MessageRouter<T>,
    lobby: &LobbyState,
    frame: InputFrame,
) -> usize {
    if lobby.is_host() || lobby.phase() != LobbyPhase::InGame {
        return 0;
    }
    match (lobby.my_id(), lobby.host_id()) {
        (Some(me), Some(host)) => {
            router.send_to(host, &SyncMessage::input_update(me.clone(), frame))
        }
        _ => 0,
    }
}

/// Host only
pub fn broadcast_state<T: Transport>(
    router: &mut MessageRouter<T>,
    lobby: &LobbyState,
    snapshot: AuthoritativeSnapshot,
) -> usize {
    if !lobby.is_host() {
        return 0;
    }
    router.broadcast(&SyncMessage::StateUpdate(snapshot))
}

/// Host only
pub fn broadcast_lite_state<T: Transport>(
    router: &mut MessageRouter<T>,
    lobby: &LobbyState,
    lite: LiteSnapshot,
) -> usize {
    if !lobby.is_host() {
        return 0;
    }
    router.broadcast(&SyncMessage::LiteStateUpdate(lite))
}

/// Host only
pub fn broadcast_projectile_spawn<T: Transport>(
    router: &mut MessageRouter<T>,
    lobby: &LobbyState,
    spawn: ProjectileSpawn,
) -> usize {
    if !lobby.is_host() {
        return 0;
    }
    router.broadcast(&SyncMessage::ProjectileSpawn(spawn))
}
