use crate::application::Autopilot;
use crate::infrastructure::error::{CliError, Result};
use instant::{Duration, Instant};
use neon_session_core::{
    EnemyRecord, GameStateConsumer, LobbyPhase, LobbyState, PeerId, ProjectileSpawn, WorldState,
};
use neon_session_p2p::{NetSession, SessionEvent, Transport};
use tokio::time::MissedTickBehavior;

const ENEMY_SPAWN_EVERY: f64 = 2.0;
const MAX_ENEMIES: usize = 12;
const FIRE_COOLDOWN: f64 = 0.5;
const STATUS_EVERY: Duration = Duration::from_secs(1);

/// When a hosting driver presses start on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPolicy {
    /// Guests that must have joined first; `None` never starts
    pub min_guests: Option<usize>,
    pub require_ready: bool,
}

impl Default for StartPolicy {
    fn default() -> Self {
        Self {
            min_guests: Some(1),
            require_ready: false,
        }
    }
}

impl StartPolicy {
    pub fn never() -> Self {
        Self {
            min_guests: None,
            require_ready: false,
        }
    }

    pub fn is_due(&self, lobby: &LobbyState) -> bool {
        let Some(min_guests) = self.min_guests else {
            return false;
        };
        lobby.is_host()
            && lobby.phase() == LobbyPhase::InLobby
            && lobby.members().len() >= min_guests
            && (!self.require_ready || lobby.all_ready())
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub name: String,
    pub class_id: Option<String>,
    /// Mark ourselves ready as soon as we are in the lobby
    pub ready: bool,
    pub start: StartPolicy,
    pub frame_rate: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            class_id: None,
            ready: true,
            start: StartPolicy::default(),
            frame_rate: 60,
        }
    }
}

impl RunOptions {
    pub fn frame_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

/// Plays one headless peer: joins the lobby, runs a toy world once the game
/// starts and keeps it in step through the session.
pub struct GameDriver<T: Transport> {
    session: NetSession<T>,
    options: RunOptions,
    autopilot: Autopilot,
    world: Option<WorldState>,
    last_frame: Option<Instant>,
    last_status: Option<Instant>,
    next_enemy_at: f64,
    next_shot_at: f64,
    next_enemy_id: u64,
}

impl<T: Transport> GameDriver<T> {
    pub fn new(session: NetSession<T>, options: RunOptions) -> Self {
        Self {
            session,
            options,
            autopilot: Autopilot::default(),
            world: None,
            last_frame: None,
            last_status: None,
            next_enemy_at: 0.0,
            next_shot_at: 0.0,
            next_enemy_id: 1,
        }
    }

    pub fn session(&self) -> &NetSession<T> {
        &self.session
    }

    pub fn world(&self) -> Option<&WorldState> {
        self.world.as_ref()
    }

    pub async fn host(&mut self) -> Result<PeerId> {
        let my_id = self.session.host().await?;
        tracing::info!("🟢 Hosting as {}", my_id);
        self.announce()?;
        Ok(my_id)
    }

    pub async fn join(&mut self, host: PeerId) -> Result<PeerId> {
        let name = self.options.name.clone();
        let my_id = self.session.join(host.clone(), name).await?;
        tracing::info!("🟢 Joined {} as {}", host, my_id);
        self.announce()?;
        Ok(my_id)
    }

    fn announce(&mut self) -> Result<()> {
        if let Some(class_id) = self.options.class_id.clone() {
            self.session.select_class(class_id)?;
        }
        if self.options.ready {
            self.session.set_ready(true)?;
        }
        Ok(())
    }

    /// Frame loop until the session is torn down or `limit` elapses
    pub async fn run(&mut self, limit: Option<Duration>) -> Result<()> {
        let mut frames = tokio::time::interval(self.options.frame_period());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let started = Instant::now();

        loop {
            frames.tick().await;

            match self.frame(Instant::now()) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!("Session closed");
                    return Ok(());
                }
                Err(e) => {
                    self.session.teardown();
                    return Err(e);
                }
            }

            if limit.is_some_and(|limit| started.elapsed() >= limit) {
                tracing::info!("Run limit reached");
                self.session.teardown();
                return Ok(());
            }
        }
    }

    /// One frame: network, lobby, world, sync. `Ok(false)` once the session
    /// has returned to `Idle`.
    pub fn frame(&mut self, now: Instant) -> Result<bool> {
        self.session.poll();
        if self.session.phase() == LobbyPhase::Idle {
            return Ok(false);
        }

        for event in self.session.drain_events() {
            self.on_event(event)?;
        }

        if self.options.start.is_due(self.session.lobby()) {
            self.session.start_game()?;
            for event in self.session.drain_events() {
                self.on_event(event)?;
            }
        }

        let dt = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        if self.world.is_some() {
            self.step_world(dt);
            if let Some(world) = self.world.as_mut() {
                let report = self.session.sync(now, world);
                tracing::trace!(?report, "Sync");
            }
            self.log_status(now);
        }

        Ok(true)
    }

    fn on_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::IdentityAssigned { peer, role } => {
                tracing::info!("🔗 Identity {} ({})", peer, role);
            }
            SessionEvent::PeerJoined { peer, name } => {
                tracing::info!("👤 {} joined as '{}'", peer, name);
            }
            SessionEvent::JoinAccepted { peer_ids } => {
                tracing::info!("✓ Admitted; lobby has {} peers", peer_ids.len());
            }
            SessionEvent::ReadyChanged { peer, ready } => {
                tracing::info!("{} is {}", peer, if ready { "ready" } else { "not ready" });
            }
            SessionEvent::ClassChanged { peer, class_id } => {
                tracing::info!("{} picked {}", peer, class_id);
            }
            SessionEvent::GameStarted { start_time } => {
                tracing::info!("🚀 Game started at {}", start_time);
                self.seed_world()?;
            }
            SessionEvent::PeerLeft(peer) => {
                tracing::warn!("👋 {} left", peer);
                if let Some(world) = self.world.as_mut() {
                    world.players.remove(&peer);
                }
            }
            SessionEvent::HostLost(host) => {
                return Err(CliError::HostLost(host.to_string()));
            }
        }
        Ok(())
    }

    fn seed_world(&mut self) -> Result<()> {
        let lobby = self.session.lobby();
        let (Some(my_id), Some(role)) = (lobby.my_id(), lobby.role()) else {
            return Err(CliError::InvalidConfig(
                "game started without a local identity".to_string(),
            ));
        };
        self.world = Some(WorldState::seeded(
            my_id.clone(),
            role,
            &lobby.roster(),
            lobby.classes(),
        ));
        self.next_enemy_at = ENEMY_SPAWN_EVERY;
        self.next_shot_at = 0.0;
        Ok(())
    }

    fn step_world(&mut self, dt: f32) {
        let is_host = self.session.lobby().is_host();
        let Some(world) = self.world.as_mut() else {
            return;
        };

        let position = world
            .local_player()
            .map(|player| player.position())
            .unwrap_or_default();
        let frame = self.autopilot.frame(world.game_time, position);
        let firing = frame.is_pressed("fire");
        world.set_local_input(frame);
        world.advance(dt);

        if !is_host {
            return;
        }

        if world.game_time >= self.next_enemy_at && world.enemies.len() < MAX_ENEMIES {
            let angle = self.next_enemy_id as f32;
            world.enemies.push(EnemyRecord {
                id: self.next_enemy_id,
                kind: "drone".to_string(),
                x: position.x + angle.cos() * 400.0,
                y: position.y + angle.sin() * 400.0,
                hp: 10.0,
            });
            self.next_enemy_id += 1;
            self.next_enemy_at = world.game_time + ENEMY_SPAWN_EVERY;
        }

        if firing && world.game_time >= self.next_shot_at {
            let Some(player) = world.local_player() else {
                return;
            };
            let spawn = ProjectileSpawn {
                x: player.x,
                y: player.y,
                angle: player.angle,
                damage: 5.0,
                pierce: 0,
                owner_id: player.id.to_string(),
                color: None,
                hostile: false,
            };
            world.spawn_projectile(&spawn);
            self.session.broadcast_projectile_spawn(spawn);
            self.next_shot_at = world.game_time + FIRE_COOLDOWN;
        }
    }

    fn log_status(&mut self, now: Instant) {
        if self
            .last_status
            .is_some_and(|last| now.saturating_duration_since(last) < STATUS_EVERY)
        {
            return;
        }
        self.last_status = Some(now);

        if let Some(world) = &self.world {
            tracing::info!(
                game_time = world.game_time,
                players = world.players.len(),
                enemies = world.enemies.len(),
                projectiles = world.projectiles.len(),
                peers = self.session.connected_peers().len(),
                "⏱ World"
            );
        }
    }
}
