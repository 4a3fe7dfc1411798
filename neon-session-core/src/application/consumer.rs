use crate::application::{reconcile, HardOverwrite};
use crate::domain::{
    AuthoritativeSnapshot, InputFrame, LiteSnapshot, PeerId, ProjectileSpawn, WorldState,
};

/// The game side of a session.
///
/// The sync loop reads snapshots and local input through this trait and
/// writes host state and remote input back through it. Rendering, physics
/// and progression stay behind the implementation.
pub trait GameStateConsumer {
    /// Full authoritative view, taken on the host each state tick
    fn snapshot(&self) -> AuthoritativeSnapshot;

    /// Reduced view with at most `enemy_limit` enemies
    fn lite_snapshot(&self, enemy_limit: usize) -> LiteSnapshot;

    /// Guest side: reconcile against the host's snapshot
    fn apply_snapshot(&mut self, snapshot: AuthoritativeSnapshot, local_id: &PeerId);

    fn apply_lite_snapshot(&mut self, lite: &LiteSnapshot, local_id: &PeerId, threshold: f32);

    /// This tick's control state for the local avatar
    fn local_input(&self) -> InputFrame;

    /// Store control state for another peer's avatar; unknown peers are ignored
    fn apply_remote_input(&mut self, peer: &PeerId, frame: InputFrame);

    fn spawn_projectile(&mut self, spawn: &ProjectileSpawn);
}

impl GameStateConsumer for WorldState {
    fn snapshot(&self) -> AuthoritativeSnapshot {
        AuthoritativeSnapshot {
            players: Some(self.players.values().cloned().collect()),
            enemies: Some(self.enemies.clone()),
            projectiles: Some(self.projectiles.clone()),
            game_time: Some(self.game_time),
        }
    }

    fn lite_snapshot(&self, enemy_limit: usize) -> LiteSnapshot {
        reconcile::lite_snapshot(self, enemy_limit)
    }

    fn apply_snapshot(&mut self, snapshot: AuthoritativeSnapshot, local_id: &PeerId) {
        debug_assert_eq!(self.local_id(), local_id);
        reconcile::apply_snapshot(self, snapshot, &mut HardOverwrite);
    }

    fn apply_lite_snapshot(&mut self, lite: &LiteSnapshot, local_id: &PeerId, threshold: f32) {
        debug_assert_eq!(self.local_id(), local_id);
        reconcile::apply_lite_snapshot(self, lite, threshold);
    }

    fn local_input(&self) -> InputFrame {
        self.local_player()
            .and_then(|p| p.pending_input.clone())
            .unwrap_or_default()
    }

    fn apply_remote_input(&mut self, peer: &PeerId, frame: InputFrame) {
        match self.players.get_mut(peer) {
            Some(player) => player.pending_input = Some(frame),
            None => tracing::trace!(%peer, "Input for unknown player ignored"),
        }
    }

    fn spawn_projectile(&mut self, spawn: &ProjectileSpawn) {
        reconcile::spawn_projectile(self, spawn);
    }
}
