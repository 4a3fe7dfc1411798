pub mod application;
pub mod domain;

pub use application::{
    reconcile_players, GameStateConsumer, HardOverwrite, Smoothing, DEFAULT_CORRECTION_THRESHOLD,
};
pub use domain::{
    AuthoritativeSnapshot, EnemyRecord, InputFrame, LiteEnemy, LitePlayer, LiteSnapshot,
    LobbyError, LobbyPhase, LobbyState, MessageTag, PeerId, PlayerRecord, ProjectileRecord,
    ProjectileSpawn, ProtocolError, Role, SyncMessage, Timestamp, Vec2, WorldState,
};
