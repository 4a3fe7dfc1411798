use crate::application::Smoothing;
use crate::domain::{
    AuthoritativeSnapshot, LiteEnemy, LitePlayer, LiteSnapshot, PeerId, PlayerRecord,
    ProjectileRecord, ProjectileSpawn, WorldState,
};
use std::collections::BTreeMap;

/// Distance beyond which lite updates snap the local avatar to the host position
pub const DEFAULT_CORRECTION_THRESHOLD: f32 = 150.0;

/// Projectiles the host spawns for players
pub const FRIENDLY_PROJECTILE_SPEED: f32 = 14.0;
pub const FRIENDLY_PROJECTILE_LIFE: u32 = 140;
pub const FRIENDLY_PROJECTILE_COLOR: &str = "#00FFFF";

/// Projectiles the host spawns for enemies
pub const HOSTILE_PROJECTILE_SPEED: f32 = 6.0;
pub const HOSTILE_PROJECTILE_LIFE: u32 = 300;
pub const HOSTILE_PROJECTILE_COLOR: &str = "#FF0000";

/// Replace the local player collection with `incoming`.
///
/// Locally predicted `pending_input` survives on every entry whose id exists
/// on both sides. The local avatar takes the host's canonical fields, then
/// passes through `smoothing` with its pre-snapshot record.
pub fn reconcile_players(
    local: &mut BTreeMap<PeerId, PlayerRecord>,
    incoming: Vec<PlayerRecord>,
    local_id: &PeerId,
    smoothing: &mut dyn Smoothing,
) {
    let previous_local = local.get(local_id).cloned();

    let mut next: BTreeMap<PeerId, PlayerRecord> = incoming
        .into_iter()
        .map(|mut record| {
            if let Some(existing) = local.get(&record.id) {
                record.pending_input = existing.pending_input.clone();
            }
            (record.id.clone(), record)
        })
        .collect();

    match (previous_local, next.get_mut(local_id)) {
        (Some(previous), Some(current)) => smoothing.smooth(&previous, current),
        (Some(_), None) => {
            tracing::debug!(peer = %local_id, "Snapshot omitted local avatar");
        }
        _ => {}
    }

    *local = next;
}

/// Apply every field present in `snapshot`; absent fields are left alone
pub fn apply_snapshot(
    world: &mut WorldState,
    snapshot: AuthoritativeSnapshot,
    smoothing: &mut dyn Smoothing,
) {
    if let Some(players) = snapshot.players {
        let local_id = world.local_id().clone();
        reconcile_players(&mut world.players, players, &local_id, smoothing);
    }
    if let Some(enemies) = snapshot.enemies {
        world.enemies = enemies;
    }
    if let Some(projectiles) = snapshot.projectiles {
        world.projectiles = projectiles;
    }
    if let Some(game_time) = snapshot.game_time {
        world.game_time = game_time;
    }
}

/// Blend a lite update into the world.
///
/// The local avatar takes the host's hit points always, but its position
/// only when it has drifted more than `threshold` away. Remote avatars and
/// known enemies take the host's values; unknown ids are ignored.
pub fn apply_lite_snapshot(world: &mut WorldState, lite: &LiteSnapshot, threshold: f32) {
    world.game_time = lite.time;
    let local_id = world.local_id().clone();

    for update in &lite.players {
        let Some(player) = world.players.get_mut(&update.id) else {
            continue;
        };

        if update.id == local_id {
            player.hp = update.hp;
            let drift = (player.x - update.x).hypot(player.y - update.y);
            if drift > threshold {
                tracing::debug!(drift, "Snapping local avatar to host position");
                player.x = update.x;
                player.y = update.y;
            }
        } else {
            player.x = update.x;
            player.y = update.y;
            player.hp = update.hp;
            player.angle = update.angle;
        }
    }

    for update in &lite.enemies {
        if let Some(enemy) = world.enemies.iter_mut().find(|e| e.id == update.id) {
            enemy.x = update.x;
            enemy.y = update.y;
            enemy.hp = update.hp;
        }
    }
}

/// Reduced view of the world: every avatar and the first `enemy_limit` enemies
pub fn lite_snapshot(world: &WorldState, enemy_limit: usize) -> LiteSnapshot {
    LiteSnapshot {
        players: world
            .players
            .values()
            .map(|p| LitePlayer {
                id: p.id.clone(),
                x: p.x,
                y: p.y,
                hp: p.hp,
                angle: p.angle,
            })
            .collect(),
        enemies: world
            .enemies
            .iter()
            .take(enemy_limit)
            .map(|e| LiteEnemy {
                id: e.id,
                x: e.x,
                y: e.y,
                hp: e.hp,
            })
            .collect(),
        time: world.game_time,
    }
}

/// Materialize a projectile announced by the host. Returns its local id.
pub fn spawn_projectile(world: &mut WorldState, spawn: &ProjectileSpawn) -> u64 {
    let (speed, life, default_color) = if spawn.hostile {
        (
            HOSTILE_PROJECTILE_SPEED,
            HOSTILE_PROJECTILE_LIFE,
            HOSTILE_PROJECTILE_COLOR,
        )
    } else {
        (
            FRIENDLY_PROJECTILE_SPEED,
            FRIENDLY_PROJECTILE_LIFE,
            FRIENDLY_PROJECTILE_COLOR,
        )
    };

    world.push_projectile(ProjectileRecord {
        id: 0,
        owner_id: spawn.owner_id.clone(),
        x: spawn.x,
        y: spawn.y,
        vx: spawn.angle.cos() * speed,
        vy: spawn.angle.sin() * speed,
        damage: spawn.damage,
        pierce: spawn.pierce,
        life,
        hostile: spawn.hostile,
        color: spawn
            .color
            .clone()
            .unwrap_or_else(|| default_color.to_string()),
    })
}
