use crate::domain::{EnemyRecord, PeerId, PlayerRecord, ProjectileRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Partial view of the shared world, produced only by the host.
///
/// Absent fields leave the receiver's copy untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AuthoritativeSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<PlayerRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemies: Option<Vec<EnemyRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectiles: Option<Vec<ProjectileRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_time: Option<f64>,
}

impl AuthoritativeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.players.is_none()
            && self.enemies.is_none()
            && self.projectiles.is_none()
            && self.game_time.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LitePlayer {
    pub id: PeerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LiteEnemy {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
}

/// Positions and hit points only, sent at a higher rate than full snapshots
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LiteSnapshot {
    pub players: Vec<LitePlayer>,
    pub enemies: Vec<LiteEnemy>,
    pub time: f64,
}

/// A projectile fired on the host that guests materialize locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProjectileSpawn {
    pub x: f32,
    pub y: f32,
    /// Direction of flight in radians
    pub angle: f32,
    pub damage: f32,
    pub pierce: u32,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub hostile: bool,
}
