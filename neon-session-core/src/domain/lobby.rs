use crate::domain::{PeerId, Role, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Where the local process is in the lobby handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum LobbyPhase {
    #[default]
    Idle,
    /// Transport is opening with the host role
    Hosting,
    /// Transport is opening and connecting to a host
    Joining,
    InLobby,
    /// Host has announced the start time
    Starting,
    InGame,
}

impl fmt::Display for LobbyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LobbyPhase::Idle => "Idle",
            LobbyPhase::Hosting => "Hosting",
            LobbyPhase::Joining => "Joining",
            LobbyPhase::InLobby => "InLobby",
            LobbyPhase::Starting => "Starting",
            LobbyPhase::InGame => "InGame",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("Cannot {action} while in phase {phase}")]
    InvalidTransition {
        phase: LobbyPhase,
        action: &'static str,
    },

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("No local identity assigned yet")]
    NoIdentity,
}

/// Lobby state as seen by one peer.
///
/// `members` only holds remote peers; the full roster is the local identity
/// plus `members`. Ready and class maps may hold the local identity as well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyState {
    my_id: Option<PeerId>,
    role: Option<Role>,
    host_id: Option<PeerId>,
    phase: LobbyPhase,
    members: BTreeSet<PeerId>,
    ready: HashMap<PeerId, bool>,
    classes: HashMap<PeerId, String>,
    names: HashMap<PeerId, String>,
    started: bool,
    start_time: Option<Timestamp>,
    join_accepted: bool,
}

impl LobbyState {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Getters =====

    pub fn my_id(&self) -> Option<&PeerId> {
        self.my_id.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Some(Role::Host)
    }

    pub fn host_id(&self) -> Option<&PeerId> {
        self.host_id.as_ref()
    }

    pub fn phase(&self) -> LobbyPhase {
        self.phase
    }

    pub fn members(&self) -> &BTreeSet<PeerId> {
        &self.members
    }

    pub fn is_member(&self, peer: &PeerId) -> bool {
        self.members.contains(peer)
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn join_accepted(&self) -> bool {
        self.join_accepted
    }

    pub fn ready_of(&self, peer: &PeerId) -> bool {
        self.ready.get(peer).copied().unwrap_or(false)
    }

    /// The ready flag only if one was ever recorded for `peer`
    pub fn ready_flag(&self, peer: &PeerId) -> Option<bool> {
        self.ready.get(peer).copied()
    }

    pub fn class_of(&self, peer: &PeerId) -> Option<&str> {
        self.classes.get(peer).map(String::as_str)
    }

    pub fn name_of(&self, peer: &PeerId) -> Option<&str> {
        self.names.get(peer).map(String::as_str)
    }

    pub fn classes(&self) -> &HashMap<PeerId, String> {
        &self.classes
    }

    /// Local identity followed by every remote member, sorted
    pub fn roster(&self) -> Vec<PeerId> {
        let mut roster: BTreeSet<PeerId> = self.members.clone();
        if let Some(me) = &self.my_id {
            roster.insert(me.clone());
        }
        roster.into_iter().collect()
    }

    /// Whether every roster entry has flagged ready.
    ///
    /// Advisory only: starting the game does not consult it.
    pub fn all_ready(&self) -> bool {
        let roster = self.roster();
        !roster.is_empty() && roster.iter().all(|peer| self.ready_of(peer))
    }

    // ===== Transitions =====

    pub fn begin_hosting(&mut self) -> Result<(), LobbyError> {
        self.expect_phase(&[LobbyPhase::Idle], "host")?;
        self.role = Some(Role::Host);
        self.phase = LobbyPhase::Hosting;
        Ok(())
    }

    pub fn begin_joining(&mut self, host: PeerId) -> Result<(), LobbyError> {
        self.expect_phase(&[LobbyPhase::Idle], "join")?;
        self.role = Some(Role::Guest);
        self.host_id = Some(host);
        self.phase = LobbyPhase::Joining;
        Ok(())
    }

    /// Transport assigned `my_id`; the lobby is now open.
    ///
    /// A guest lists its host as a pending, not-ready member straight away.
    pub fn enter_lobby(&mut self, my_id: PeerId) -> Result<(), LobbyError> {
        self.expect_phase(&[LobbyPhase::Hosting, LobbyPhase::Joining], "enter lobby")?;

        match self.role {
            Some(Role::Host) => {
                self.host_id = Some(my_id.clone());
            }
            Some(Role::Guest) => {
                if let Some(host) = self.host_id.clone() {
                    self.members.insert(host.clone());
                    self.ready.insert(host, false);
                }
            }
            None => return Err(LobbyError::NoIdentity),
        }

        self.my_id = Some(my_id);
        self.phase = LobbyPhase::InLobby;
        Ok(())
    }

    /// Drop everything and return to `Idle`
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Register a remote member as not ready. Returns `true` if it was new.
    pub fn add_member(&mut self, peer: PeerId, name: Option<String>) -> bool {
        if self.my_id.as_ref() == Some(&peer) {
            return false;
        }

        if let Some(name) = name {
            self.names.insert(peer.clone(), name);
        }
        self.ready.insert(peer.clone(), false);
        self.members.insert(peer)
    }

    /// Learn about peers listed by the host without resetting what is known
    pub fn note_peers(&mut self, peers: &[PeerId]) {
        for peer in peers {
            if self.my_id.as_ref() == Some(peer) {
                continue;
            }
            self.ready.entry(peer.clone()).or_insert(false);
            self.members.insert(peer.clone());
        }
    }

    /// Forget a departed peer. Returns `true` if it was a member.
    pub fn remove_member(&mut self, peer: &PeerId) -> bool {
        self.ready.remove(peer);
        self.classes.remove(peer);
        self.names.remove(peer);
        self.members.remove(peer)
    }

    /// Last write wins per identity
    pub fn set_ready(&mut self, peer: PeerId, ready: bool) {
        self.ready.insert(peer, ready);
    }

    pub fn set_class(&mut self, peer: PeerId, class_id: String) {
        self.classes.insert(peer, class_id);
    }

    pub fn mark_join_accepted(&mut self) {
        self.join_accepted = true;
    }

    pub fn begin_start(&mut self) -> Result<(), LobbyError> {
        if !self.is_host() {
            return Err(LobbyError::NotHost("start the game"));
        }
        self.expect_phase(&[LobbyPhase::InLobby], "start")?;
        self.phase = LobbyPhase::Starting;
        Ok(())
    }

    /// Hosts arrive here from `Starting`; guests straight from the lobby when
    /// the host's start message lands, regardless of their ready flag.
    pub fn enter_game(&mut self, start_time: Timestamp) -> Result<(), LobbyError> {
        let allowed: &[LobbyPhase] = if self.is_host() {
            &[LobbyPhase::Starting]
        } else {
            &[LobbyPhase::Joining, LobbyPhase::InLobby, LobbyPhase::Starting]
        };
        self.expect_phase(allowed, "enter game")?;

        self.started = true;
        self.start_time = Some(start_time);
        self.phase = LobbyPhase::InGame;
        Ok(())
    }

    fn expect_phase(&self, allowed: &[LobbyPhase], action: &'static str) -> Result<(), LobbyError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(LobbyError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosting_lobby() -> LobbyState {
        let mut lobby = LobbyState::new();
        lobby.begin_hosting().unwrap();
        lobby.enter_lobby(PeerId::from("H1")).unwrap();
        lobby
    }

    fn joined_lobby() -> LobbyState {
        let mut lobby = LobbyState::new();
        lobby.begin_joining(PeerId::from("H1")).unwrap();
        lobby.enter_lobby(PeerId::from("G1")).unwrap();
        lobby
    }

    #[test]
    fn test_host_starts_alone() {
        let lobby = hosting_lobby();

        assert_eq!(lobby.phase(), LobbyPhase::InLobby);
        assert!(lobby.members().is_empty());
        assert_eq!(lobby.roster(), vec![PeerId::from("H1")]);
        assert_eq!(lobby.host_id(), Some(&PeerId::from("H1")));
    }

    #[test]
    fn test_guest_lists_host_as_pending_member() {
        let lobby = joined_lobby();

        assert!(lobby.is_member(&PeerId::from("H1")));
        assert!(!lobby.ready_of(&PeerId::from("H1")));
        assert_eq!(lobby.roster().len(), 2);
    }

    #[test]
    fn test_cannot_join_while_hosting() {
        let mut lobby = hosting_lobby();
        let err = lobby.begin_joining(PeerId::from("X")).unwrap_err();
        assert!(matches!(err, LobbyError::InvalidTransition { .. }));
    }

    #[test]
    fn test_add_member_resets_ready() {
        let mut lobby = hosting_lobby();
        let g1 = PeerId::from("G1");

        assert!(lobby.add_member(g1.clone(), Some("Alice".to_string())));
        lobby.set_ready(g1.clone(), true);
        assert!(!lobby.add_member(g1.clone(), None));

        assert!(!lobby.ready_of(&g1));
        assert_eq!(lobby.name_of(&g1), Some("Alice"));
    }

    #[test]
    fn test_add_member_ignores_self() {
        let mut lobby = hosting_lobby();
        assert!(!lobby.add_member(PeerId::from("H1"), None));
        assert!(lobby.members().is_empty());
    }

    #[test]
    fn test_remove_member_clears_all_maps() {
        let mut lobby = hosting_lobby();
        let g1 = PeerId::from("G1");
        lobby.add_member(g1.clone(), Some("Alice".to_string()));
        lobby.set_ready(g1.clone(), true);
        lobby.set_class(g1.clone(), "vanguard".to_string());

        assert!(lobby.remove_member(&g1));
        assert!(!lobby.ready_of(&g1));
        assert_eq!(lobby.class_of(&g1), None);
        assert_eq!(lobby.name_of(&g1), None);
        assert!(!lobby.remove_member(&g1));
    }

    #[test]
    fn test_all_ready_covers_local_identity() {
        let mut lobby = hosting_lobby();
        let g1 = PeerId::from("G1");
        lobby.add_member(g1.clone(), None);
        lobby.set_ready(g1, true);

        assert!(!lobby.all_ready());
        lobby.set_ready(PeerId::from("H1"), true);
        assert!(lobby.all_ready());
    }

    #[test]
    fn test_guest_cannot_start() {
        let mut lobby = joined_lobby();
        assert_eq!(
            lobby.begin_start(),
            Err(LobbyError::NotHost("start the game"))
        );
    }

    #[test]
    fn test_host_start_sequence() {
        let mut lobby = hosting_lobby();
        lobby.begin_start().unwrap();
        assert_eq!(lobby.phase(), LobbyPhase::Starting);

        lobby.enter_game(Timestamp::from_millis(42)).unwrap();
        assert!(lobby.started());
        assert_eq!(lobby.start_time(), Some(Timestamp::from_millis(42)));
    }

    #[test]
    fn test_guest_enters_game_without_ready() {
        let mut lobby = joined_lobby();
        lobby.enter_game(Timestamp::from_millis(1)).unwrap();
        assert_eq!(lobby.phase(), LobbyPhase::InGame);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut lobby = joined_lobby();
        lobby.set_class(PeerId::from("G1"), "sniper".to_string());
        lobby.reset();

        assert_eq!(lobby.phase(), LobbyPhase::Idle);
        assert!(lobby.my_id().is_none());
        assert!(lobby.classes().is_empty());
        assert!(lobby.begin_hosting().is_ok());
    }

    #[test]
    fn test_note_peers_keeps_known_ready_flags() {
        let mut lobby = joined_lobby();
        lobby.set_ready(PeerId::from("H1"), true);
        lobby.note_peers(&[PeerId::from("H1"), PeerId::from("G1"), PeerId::from("G2")]);

        assert!(lobby.ready_of(&PeerId::from("H1")));
        assert!(lobby.is_member(&PeerId::from("G2")));
        assert!(!lobby.is_member(&PeerId::from("G1")));
    }
}
