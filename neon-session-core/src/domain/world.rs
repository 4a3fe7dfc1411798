use crate::domain::{PeerId, Role};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Horizontal gap between spawn points of consecutive roster entries
pub const SPAWN_SPACING: f32 = 500.0;

/// Hit points every avatar starts with
pub const DEFAULT_PLAYER_HP: f32 = 100.0;

/// Movement speed applied by [`WorldState::advance`], in units per second
pub const PLAYER_SPEED: f32 = 240.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Vec2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Control state sampled once per local tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InputFrame {
    /// Discrete key states by binding name (`"up"`, `"dash"`, ...)
    #[serde(default)]
    pub keys: BTreeMap<String, bool>,
    /// Normalized movement direction
    #[serde(default)]
    pub movement: Vec2,
    /// Pointer position in world coordinates
    #[serde(default)]
    pub pointer: Vec2,
}

impl InputFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>, pressed: bool) -> Self {
        self.keys.insert(key.into(), pressed);
        self
    }

    pub fn with_movement(mut self, x: f32, y: f32) -> Self {
        self.movement = Vec2::new(x, y);
        self
    }

    pub fn with_pointer(mut self, x: f32, y: f32) -> Self {
        self.pointer = Vec2::new(x, y);
        self
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }
}

/// One avatar in the shared world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PlayerRecord {
    pub id: PeerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub class_id: Option<String>,

    /// Latest control state known for this avatar. Written locally only;
    /// never sent over the wire.
    #[serde(skip)]
    pub pending_input: Option<InputFrame>,
}

impl PlayerRecord {
    pub fn new(id: PeerId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            hp: DEFAULT_PLAYER_HP,
            max_hp: DEFAULT_PLAYER_HP,
            angle: 0.0,
            class_id: None,
            pending_input: None,
        }
    }

    pub fn with_class(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    pub fn with_hp(mut self, hp: f32) -> Self {
        self.hp = hp;
        self
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EnemyRecord {
    pub id: u64,
    #[serde(default)]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProjectileRecord {
    pub id: u64,
    /// Peer id for player shots, enemy id for hostile ones
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub pierce: u32,
    /// Remaining lifetime in simulation ticks
    pub life: u32,
    pub hostile: bool,
    pub color: String,
}

/// Reference world model used by the session tooling and tests.
///
/// `players` always contains the local avatar under `local_id` once seeded.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    local_id: PeerId,
    pub players: BTreeMap<PeerId, PlayerRecord>,
    pub enemies: Vec<EnemyRecord>,
    pub projectiles: Vec<ProjectileRecord>,
    pub game_time: f64,
    next_projectile_id: u64,
}

impl WorldState {
    pub fn new(local_id: PeerId) -> Self {
        Self {
            local_id,
            players: BTreeMap::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            game_time: 0.0,
            next_projectile_id: 1,
        }
    }

    /// Build the opening world for a session.
    ///
    /// The local avatar spawns at the origin, shifted one spacing to the right
    /// for guests so host and guest do not overlap before the first snapshot.
    /// Roster peers spawn at increasing multiples of the spacing.
    pub fn seeded(
        local_id: PeerId,
        role: Role,
        peers: &[PeerId],
        classes: &HashMap<PeerId, String>,
    ) -> Self {
        let mut world = Self::new(local_id.clone());

        let local_x = if role.is_host() { 0.0 } else { SPAWN_SPACING };
        world.insert_player(local_id.clone(), local_x, classes.get(&local_id));

        for (index, peer) in peers.iter().filter(|p| **p != local_id).enumerate() {
            let x = SPAWN_SPACING * (index as f32 + 1.0);
            world.insert_player(peer.clone(), x, classes.get(peer));
        }

        world
    }

    fn insert_player(&mut self, id: PeerId, x: f32, class_id: Option<&String>) {
        let mut record = PlayerRecord::new(id.clone(), x, 0.0);
        record.class_id = class_id.cloned();
        self.players.insert(id, record);
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn local_player(&self) -> Option<&PlayerRecord> {
        self.players.get(&self.local_id)
    }

    pub fn local_player_mut(&mut self) -> Option<&mut PlayerRecord> {
        self.players.get_mut(&self.local_id)
    }

    /// Record this tick's local control state on the local avatar
    pub fn set_local_input(&mut self, frame: InputFrame) {
        if let Some(player) = self.players.get_mut(&self.local_id) {
            player.pending_input = Some(frame);
        }
    }

    pub fn next_projectile_id(&mut self) -> u64 {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        id
    }

    pub fn push_projectile(&mut self, mut projectile: ProjectileRecord) -> u64 {
        projectile.id = self.next_projectile_id();
        let id = projectile.id;
        self.projectiles.push(projectile);
        id
    }

    /// Integrates avatar movement and projectile flight over `dt` seconds.
    ///
    /// This is the minimal stand-in simulation the CLI drives; the real game
    /// plugs its own physics in front of the session.
    pub fn advance(&mut self, dt: f32) {
        for player in self.players.values_mut() {
            if let Some(input) = &player.pending_input {
                player.x += input.movement.x * PLAYER_SPEED * dt;
                player.y += input.movement.y * PLAYER_SPEED * dt;
                player.angle = (input.pointer.y - player.y).atan2(input.pointer.x - player.x);
            }
        }

        for projectile in self.projectiles.iter_mut() {
            projectile.x += projectile.vx;
            projectile.y += projectile.vy;
            projectile.life = projectile.life.saturating_sub(1);
        }
        self.projectiles.retain(|p| p.life > 0);

        self.game_time += f64::from(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_host_spawns_at_origin_and_offsets_peers() {
        let host = PeerId::from("H1");
        let peers = vec![PeerId::from("G1"), PeerId::from("G2")];
        let world = WorldState::seeded(host.clone(), Role::Host, &peers, &HashMap::new());

        assert_eq!(world.players.len(), 3);
        assert_eq!(world.local_player().unwrap().x, 0.0);
        assert_eq!(world.players[&PeerId::from("G1")].x, SPAWN_SPACING);
        assert_eq!(world.players[&PeerId::from("G2")].x, SPAWN_SPACING * 2.0);
    }

    #[test]
    fn test_seeded_guest_shifts_own_spawn() {
        let guest = PeerId::from("G1");
        let peers = vec![PeerId::from("H1")];
        let world = WorldState::seeded(guest, Role::Guest, &peers, &HashMap::new());

        assert_eq!(world.local_player().unwrap().x, SPAWN_SPACING);
    }

    #[test]
    fn test_seeded_skips_self_in_peer_list() {
        let host = PeerId::from("H1");
        let peers = vec![PeerId::from("H1"), PeerId::from("G1")];
        let world = WorldState::seeded(host, Role::Host, &peers, &HashMap::new());

        assert_eq!(world.players.len(), 2);
    }

    #[test]
    fn test_seeded_applies_selected_classes() {
        let host = PeerId::from("H1");
        let mut classes = HashMap::new();
        classes.insert(PeerId::from("H1"), "vanguard".to_string());

        let world = WorldState::seeded(host, Role::Host, &[], &classes);
        assert_eq!(
            world.local_player().unwrap().class_id.as_deref(),
            Some("vanguard")
        );
    }

    #[test]
    fn test_pending_input_is_not_serialized() {
        let mut record = PlayerRecord::new(PeerId::from("G1"), 1.0, 2.0);
        record.pending_input = Some(InputFrame::new().with_key("up", true));

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("pending_input").is_none());

        let back: PlayerRecord = serde_json::from_value(json).unwrap();
        assert!(back.pending_input.is_none());
    }

    #[test]
    fn test_advance_moves_by_pending_input_and_expires_projectiles() {
        let mut world = WorldState::new(PeerId::from("H1"));
        world
            .players
            .insert(PeerId::from("H1"), PlayerRecord::new(PeerId::from("H1"), 0.0, 0.0));
        world.set_local_input(InputFrame::new().with_movement(1.0, 0.0));
        world.push_projectile(ProjectileRecord {
            id: 0,
            owner_id: "H1".to_string(),
            x: 0.0,
            y: 0.0,
            vx: 1.0,
            vy: 0.0,
            damage: 1.0,
            pierce: 0,
            life: 1,
            hostile: false,
            color: "#00FFFF".to_string(),
        });

        world.advance(0.5);

        assert_eq!(world.local_player().unwrap().x, PLAYER_SPEED * 0.5);
        assert!(world.projectiles.is_empty());
        assert!((world.game_time - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_input_frame_keys() {
        let frame = InputFrame::new().with_key("up", true).with_key("left", false);
        assert!(frame.is_pressed("up"));
        assert!(!frame.is_pressed("left"));
        assert!(!frame.is_pressed("dash"));
    }
}
