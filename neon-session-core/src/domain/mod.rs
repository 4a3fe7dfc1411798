pub mod lobby;
pub mod message;
pub mod peer;
pub mod snapshot;
pub mod timestamp;
pub mod world;

pub use lobby::{LobbyError, LobbyPhase, LobbyState};
pub use message::{MessageTag, ProtocolError, SyncMessage, MAX_MESSAGE_BYTES};
pub use peer::{PeerId, Role};
pub use snapshot::{AuthoritativeSnapshot, LiteEnemy, LitePlayer, LiteSnapshot, ProjectileSpawn};
pub use timestamp::Timestamp;
pub use world::{EnemyRecord, InputFrame, PlayerRecord, ProjectileRecord, Vec2, WorldState};
