use crate::domain::{
    AuthoritativeSnapshot, InputFrame, LiteSnapshot, PeerId, ProjectileSpawn, Timestamp, Vec2,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest payload the codec accepts, in bytes
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024;

/// Every message exchanged between peers, lobby and gameplay alike.
///
/// On the wire: `{"type": "<Tag>", "payload": {...}}`. Unknown tags, missing
/// fields and unknown fields are all rejected by [`SyncMessage::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "payload", deny_unknown_fields)]
pub enum SyncMessage {
    /// Guest asks the host to be admitted
    JoinRequest { display_name: String },

    /// Host admits a guest
    JoinAccept {
        state: AuthoritativeSnapshot,
        peer_ids: Vec<PeerId>,
    },

    StateUpdate(AuthoritativeSnapshot),

    LiteStateUpdate(LiteSnapshot),

    ProjectileSpawn(ProjectileSpawn),

    InputUpdate {
        identity: PeerId,
        keys: BTreeMap<String, bool>,
        movement: Vec2,
        pointer: Vec2,
    },

    ReadyStatus { identity: PeerId, ready: bool },

    ClassSelect { identity: PeerId, class_id: String },

    UpgradeSelect { identity: PeerId, upgrade_id: String },

    ModuleEnter { identity: PeerId },

    ModuleExit { identity: PeerId },

    /// Shared start barrier, wall-clock unix milliseconds
    StartGame { start_time: Timestamp },
}

/// Routing key of a [`SyncMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageTag {
    JoinRequest,
    JoinAccept,
    StateUpdate,
    LiteStateUpdate,
    ProjectileSpawn,
    InputUpdate,
    ReadyStatus,
    ClassSelect,
    UpgradeSelect,
    ModuleEnter,
    ModuleExit,
    StartGame,
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Message of {size} bytes exceeds limit of {max}")]
    TooLarge { size: usize, max: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncMessage {
    pub fn input_update(identity: PeerId, frame: InputFrame) -> Self {
        SyncMessage::InputUpdate {
            identity,
            keys: frame.keys,
            movement: frame.movement,
            pointer: frame.pointer,
        }
    }

    pub fn tag(&self) -> MessageTag {
        match self {
            SyncMessage::JoinRequest { .. } => MessageTag::JoinRequest,
            SyncMessage::JoinAccept { .. } => MessageTag::JoinAccept,
            SyncMessage::StateUpdate(_) => MessageTag::StateUpdate,
            SyncMessage::LiteStateUpdate(_) => MessageTag::LiteStateUpdate,
            SyncMessage::ProjectileSpawn(_) => MessageTag::ProjectileSpawn,
            SyncMessage::InputUpdate { .. } => MessageTag::InputUpdate,
            SyncMessage::ReadyStatus { .. } => MessageTag::ReadyStatus,
            SyncMessage::ClassSelect { .. } => MessageTag::ClassSelect,
            SyncMessage::UpgradeSelect { .. } => MessageTag::UpgradeSelect,
            SyncMessage::ModuleEnter { .. } => MessageTag::ModuleEnter,
            SyncMessage::ModuleExit { .. } => MessageTag::ModuleExit,
            SyncMessage::StartGame { .. } => MessageTag::StartGame,
        }
    }

    /// The peer a message speaks for, if it is identity-scoped
    pub fn identity(&self) -> Option<&PeerId> {
        match self {
            SyncMessage::InputUpdate { identity, .. }
            | SyncMessage::ReadyStatus { identity, .. }
            | SyncMessage::ClassSelect { identity, .. }
            | SyncMessage::UpgradeSelect { identity, .. }
            | SyncMessage::ModuleEnter { identity }
            | SyncMessage::ModuleExit { identity } => Some(identity),
            _ => None,
        }
    }

    /// Messages the host forwards to every other guest
    pub fn is_relayed(&self) -> bool {
        self.identity().is_some()
    }

    /// Messages a guest accepts only when they come from its host
    pub fn is_host_authored(&self) -> bool {
        matches!(
            self.tag(),
            MessageTag::JoinAccept
                | MessageTag::StartGame
                | MessageTag::StateUpdate
                | MessageTag::LiteStateUpdate
                | MessageTag::ProjectileSpawn
        )
    }

    /// Control state carried by an `InputUpdate`
    pub fn input_frame(&self) -> Option<InputFrame> {
        match self {
            SyncMessage::InputUpdate {
                keys,
                movement,
                pointer,
                ..
            } => Some(InputFrame {
                keys: keys.clone(),
                movement: *movement,
                pointer: *pointer,
            }),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let bytes = serde_json::to_vec(self)?;
        if bytes.len() > MAX_MESSAGE_BYTES {
            return Err(ProtocolError::TooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_BYTES,
            });
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() > MAX_MESSAGE_BYTES {
            return Err(ProtocolError::TooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_BYTES,
            });
        }
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_value(value: serde_json::Value) -> Result<SyncMessage, ProtocolError> {
        SyncMessage::decode(value.to_string().as_bytes())
    }

    #[test]
    fn test_wire_shape_is_type_and_payload() {
        let msg = SyncMessage::ReadyStatus {
            identity: PeerId::from("G1"),
            ready: true,
        };
        let value: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({"type": "ReadyStatus", "payload": {"identity": "G1", "ready": true}})
        );
    }

    #[test]
    fn test_decode_join_request() {
        let msg = decode_value(json!({
            "type": "JoinRequest",
            "payload": {"display_name": "Alice"}
        }))
        .unwrap();

        assert_eq!(
            msg,
            SyncMessage::JoinRequest {
                display_name: "Alice".to_string()
            }
        );
        assert_eq!(msg.tag(), MessageTag::JoinRequest);
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        let result = decode_value(json!({"type": "Teleport", "payload": {}}));
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let result = decode_value(json!({"type": "ReadyStatus", "payload": {"identity": "G1"}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_payload_field() {
        let result = decode_value(json!({
            "type": "ReadyStatus",
            "payload": {"identity": "G1", "ready": true, "admin": true}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_envelope_field() {
        let result = decode_value(json!({
            "type": "ModuleEnter",
            "payload": {"identity": "G1"},
            "seq": 4
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(SyncMessage::decode(b"\x00\x01not json").is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_payload() {
        let bytes = vec![b' '; MAX_MESSAGE_BYTES + 1];
        assert!(matches!(
            SyncMessage::decode(&bytes),
            Err(ProtocolError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_input_update_carries_frame() {
        let frame = InputFrame::new()
            .with_key("up", true)
            .with_movement(0.0, -1.0)
            .with_pointer(10.0, 20.0);
        let msg = SyncMessage::input_update(PeerId::from("G1"), frame.clone());

        assert_eq!(msg.identity(), Some(&PeerId::from("G1")));
        assert!(msg.is_relayed());
        assert_eq!(msg.input_frame(), Some(frame));
    }

    #[test]
    fn test_state_update_payload_is_the_snapshot() {
        let msg = decode_value(json!({
            "type": "StateUpdate",
            "payload": {"game_time": 3.0}
        }))
        .unwrap();

        match msg {
            SyncMessage::StateUpdate(snapshot) => assert_eq!(snapshot.game_time, Some(3.0)),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_host_authored_classification() {
        let start = SyncMessage::StartGame {
            start_time: Timestamp::from_millis(5),
        };
        assert!(start.is_host_authored());
        assert!(!start.is_relayed());

        let ready = SyncMessage::ReadyStatus {
            identity: PeerId::from("G1"),
            ready: false,
        };
        assert!(!ready.is_host_authored());
    }
}
