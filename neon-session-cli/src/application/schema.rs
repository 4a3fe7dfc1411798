use crate::infrastructure::error::{CliError, Result};
use neon_session_core::SyncMessage;
use std::path::Path;

/// JSON schema of the wire protocol, pretty printed
pub fn protocol_schema() -> Result<String> {
    let schema = schemars::schema_for!(SyncMessage);
    Ok(serde_json::to_string_pretty(&schema)?)
}

pub fn write_protocol_schema(path: &Path) -> Result<()> {
    let schema = protocol_schema()?;
    std::fs::write(path, schema).map_err(|e| CliError::schema_write(path.to_path_buf(), e))?;
    tracing::info!("📄 Wrote protocol schema to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_every_tag() {
        let schema = protocol_schema().unwrap();
        for tag in [
            "JoinRequest",
            "JoinAccept",
            "StateUpdate",
            "LiteStateUpdate",
            "ProjectileSpawn",
            "InputUpdate",
            "ReadyStatus",
            "ClassSelect",
            "UpgradeSelect",
            "ModuleEnter",
            "ModuleExit",
            "StartGame",
        ] {
            assert!(schema.contains(tag), "missing {}", tag);
        }
    }

    #[test]
    fn test_schema_is_valid_json() {
        let schema = protocol_schema().unwrap();
        let value: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert!(value.get("$schema").is_some());
    }
}
