mod support;

use instant::{Duration, Instant};
use neon_session_core::{
    EnemyRecord, GameStateConsumer, InputFrame, MessageTag, PeerId, ProjectileSpawn, Role,
    SyncMessage, WorldState,
};
use neon_session_p2p::{NetSession, SessionConfig};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use support::{test_config, MemoryNetwork, MemoryTransport};

type Session = NetSession<MemoryTransport>;

/// Host plus the given guests, all in game
async fn in_game(
    network: &MemoryNetwork,
    config: SessionConfig,
    guests: &[&str],
) -> (Session, Vec<Session>) {
    let mut host = NetSession::new(network.endpoint("H1"), config.clone());
    host.host().await.unwrap();

    let mut joined = Vec::new();
    for id in guests {
        let mut guest = NetSession::new(network.endpoint(id), config.clone());
        guest.join(PeerId::from("H1"), *id).await.unwrap();
        joined.push(guest);
    }

    host.poll();
    host.start_game().unwrap();
    for guest in joined.iter_mut() {
        guest.poll();
        guest.drain_events();
    }
    host.drain_events();

    (host, joined)
}

fn world_for(session: &Session) -> WorldState {
    let roster = session.lobby().roster();
    let role = session.role().unwrap_or(Role::Guest);
    WorldState::seeded(
        session.local_id().cloned().unwrap(),
        role,
        &roster,
        &HashMap::new(),
    )
}

#[tokio::test]
async fn test_host_snapshot_reconciles_guest_and_keeps_input() {
    let network = MemoryNetwork::new();
    let (mut host, mut guests) = in_game(&network, test_config(), &["G1"]).await;
    let guest = &mut guests[0];

    let mut host_world = world_for(&host);
    let mut guest_world = world_for(guest);

    if let Some(record) = host_world.players.get_mut(&PeerId::from("G1")) {
        record.x = 1234.0;
        record.hp = 55.0;
    }
    host_world.game_time = 8.5;

    let frame = InputFrame::new().with_key("up", true);
    guest_world.set_local_input(frame.clone());

    let now = Instant::now();
    let report = host.sync(now, &mut host_world);
    assert_eq!(report.states_sent, 1);

    guest.poll();
    let report = guest.sync(now, &mut guest_world);
    assert_eq!(report.applied, 1);

    let local = guest_world.local_player().unwrap();
    assert_eq!(local.x, 1234.0);
    assert_eq!(local.hp, 55.0);
    assert_eq!(local.pending_input, Some(frame));
    assert_eq!(guest_world.game_time, 8.5);
}

#[tokio::test]
async fn test_guest_input_reaches_host_world() {
    let network = MemoryNetwork::new();
    let (mut host, mut guests) = in_game(&network, test_config(), &["G1"]).await;
    let guest = &mut guests[0];

    let mut host_world = world_for(&host);
    let mut guest_world = world_for(guest);
    let frame = InputFrame::new().with_movement(1.0, 0.0).with_pointer(5.0, 5.0);
    guest_world.set_local_input(frame.clone());

    let now = Instant::now();
    let report = guest.sync(now, &mut guest_world);
    assert_eq!(report.inputs_sent, 1);

    host.poll();
    let report = host.sync(now, &mut host_world);
    assert_eq!(report.applied, 1);
    assert_eq!(
        host_world.players[&PeerId::from("G1")].pending_input,
        Some(frame)
    );
}

#[tokio::test]
async fn test_host_relays_input_to_other_guests() {
    let network = MemoryNetwork::new();
    let (mut host, mut guests) = in_game(&network, test_config(), &["G1", "G2"]).await;

    let mut g1_world = world_for(&guests[0]);
    let mut g2_world = world_for(&guests[1]);
    let frame = InputFrame::new().with_key("dash", true);
    g1_world.set_local_input(frame.clone());

    let now = Instant::now();
    guests[0].sync(now, &mut g1_world);
    host.poll();

    guests[1].poll();
    guests[1].sync(now, &mut g2_world);

    assert_eq!(
        g2_world.players[&PeerId::from("G1")].pending_input,
        Some(frame)
    );
}

#[tokio::test]
async fn test_state_tick_cadence_without_catch_up() {
    let network = MemoryNetwork::new();
    let (mut host, _guests) = in_game(&network, test_config(), &["G1"]).await;
    let mut world = world_for(&host);

    let start = Instant::now();
    assert_eq!(host.sync(start, &mut world).states_sent, 1);
    assert_eq!(
        host.sync(start + Duration::from_millis(20), &mut world).states_sent,
        0
    );
    assert_eq!(
        host.sync(start + Duration::from_millis(50), &mut world).states_sent,
        1
    );

    // A long stall fires once, not once per missed interval
    let late = start + Duration::from_millis(1000);
    assert_eq!(host.sync(late, &mut world).states_sent, 1);
    assert_eq!(
        host.sync(late + Duration::from_millis(1), &mut world).states_sent,
        0
    );
}

#[tokio::test]
async fn test_no_ticks_before_game_starts() {
    let network = MemoryNetwork::new();
    let mut host = NetSession::new(network.endpoint("H1"), test_config());
    host.host().await.unwrap();
    let mut guest = NetSession::new(network.endpoint("G1"), test_config());
    guest.join(PeerId::from("H1"), "Alice").await.unwrap();
    host.poll();

    let mut host_world = world_for(&host);
    let mut guest_world = world_for(&guest);
    let now = Instant::now();

    assert_eq!(host.sync(now, &mut host_world).states_sent, 0);
    assert_eq!(guest.sync(now, &mut guest_world).inputs_sent, 0);
    assert_eq!(guest.send_input_to_host(InputFrame::new()), 0);
}

#[tokio::test]
async fn test_role_guards_on_outbound_helpers() {
    let network = MemoryNetwork::new();
    let (mut host, mut guests) = in_game(&network, test_config(), &["G1"]).await;
    let guest = &mut guests[0];
    let guest_world = world_for(guest);

    assert_eq!(guest.broadcast_state(guest_world.snapshot()), 0);
    assert_eq!(guest.broadcast_lite_state(guest_world.lite_snapshot(80)), 0);
    assert_eq!(host.send_input_to_host(InputFrame::new()), 0);

    assert_eq!(guest.send_input_to_host(InputFrame::new()), 1);
    assert_eq!(host.broadcast_state(guest_world.snapshot()), 1);
}

#[tokio::test]
async fn test_lite_updates_snap_only_beyond_threshold() {
    let network = MemoryNetwork::new();
    let config = test_config().with_lite_tick_hz(Some(30));
    let (mut host, mut guests) = in_game(&network, config, &["G1"]).await;
    let guest = &mut guests[0];

    let mut host_world = world_for(&host);
    let mut guest_world = world_for(guest);
    let guest_x = guest_world.local_player().unwrap().x;

    if let Some(record) = host_world.players.get_mut(&PeerId::from("G1")) {
        record.x = guest_x + 100.0;
        record.hp = 40.0;
    }

    let now = Instant::now();
    host.broadcast_lite_state(host_world.lite_snapshot(80));
    guest.poll();
    guest.sync(now, &mut guest_world);

    let local = guest_world.local_player().unwrap();
    assert_eq!(local.x, guest_x);
    assert_eq!(local.hp, 40.0);

    let report = host.sync(now, &mut host_world);
    assert_eq!(report.lite_sent, 1);
}

#[tokio::test]
async fn test_lite_updates_cap_enemies() {
    let network = MemoryNetwork::new();
    let config = test_config()
        .with_lite_tick_hz(Some(30))
        .with_lite_enemy_limit(2);
    let (mut host, mut guests) = in_game(&network, config, &["G1"]).await;
    let guest = &mut guests[0];

    let mut host_world = world_for(&host);
    for id in 0..4 {
        host_world.enemies.push(EnemyRecord {
            id,
            kind: "drone".to_string(),
            x: 10.0,
            y: 10.0,
            hp: 3.0,
        });
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    guest.subscribe(MessageTag::LiteStateUpdate, move |_, message| {
        if let SyncMessage::LiteStateUpdate(lite) = message {
            sink.borrow_mut().push(lite.enemies.len());
        }
    });

    host.sync(Instant::now(), &mut host_world);
    guest.poll();

    assert_eq!(*seen.borrow(), vec![2]);
}

#[tokio::test]
async fn test_projectile_spawn_materializes_on_guest() {
    let network = MemoryNetwork::new();
    let (mut host, mut guests) = in_game(&network, test_config(), &["G1"]).await;
    let guest = &mut guests[0];
    let mut guest_world = world_for(guest);

    let sent = host.broadcast_projectile_spawn(ProjectileSpawn {
        x: 1.0,
        y: 2.0,
        angle: 0.0,
        damage: 4.0,
        pierce: 0,
        owner_id: "H1".to_string(),
        color: None,
        hostile: false,
    });
    assert_eq!(sent, 1);

    guest.poll();
    guest.sync(Instant::now(), &mut guest_world);

    assert_eq!(guest_world.projectiles.len(), 1);
    assert_eq!(guest_world.projectiles[0].owner_id, "H1");
    assert_eq!(guest_world.projectiles[0].color, "#00FFFF");
}

#[tokio::test]
async fn test_host_ignores_snapshots_from_guests() {
    let network = MemoryNetwork::new();
    let (mut host, mut guests) = in_game(&network, test_config(), &["G1"]).await;
    let guest_world = world_for(&guests[0]);
    let mut host_world = world_for(&host);
    host_world.game_time = 3.0;

    network.inject_message(
        "G1",
        "H1",
        &SyncMessage::StateUpdate(guest_world.snapshot()),
    );
    host.poll();
    let report = host.sync(Instant::now(), &mut host_world);

    assert_eq!(report.applied, 0);
    assert_eq!(host_world.game_time, 3.0);
    guests[0].poll();
}
