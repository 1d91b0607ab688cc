//! `agent_pool_profiles` blocks

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::attrs::{insert_optional_scalar, ResourceData};
use crate::cluster::{
    validate_agent_pool_count, validate_agent_pool_name, AgentPoolProfile, OsType,
    DEFAULT_VM_SIZE,
};
use crate::{Error, Result};

/// Attribute key of the block list
pub const AGENT_POOL_PROFILES: &str = "agent_pool_profiles";

/// Build the ordered pool list from `agent_pool_profiles = [{ name, count, vm_size, os_disk_size, os_type }, ...]`
///
/// At least one pool is required and names must be distinct. `count`
/// defaults to 1, `vm_size` to [`DEFAULT_VM_SIZE`] and `os_type` to Linux.
pub fn expand_agent_pool_profiles(data: &ResourceData) -> Result<Vec<AgentPoolProfile>> {
    let blocks = data.blocks(AGENT_POOL_PROFILES)?;
    if blocks.is_empty() {
        return Err(Error::validation(
            AGENT_POOL_PROFILES,
            "at least one agent pool is required",
        ));
    }

    let mut seen = BTreeSet::new();
    let mut profiles = Vec::with_capacity(blocks.len());
    for block in blocks {
        let name = block.required_string("name")?;
        validate_agent_pool_name(name, &block.field("name"))?;
        if !seen.insert(name) {
            return Err(Error::validation(
                block.field("name"),
                format!("duplicate agent pool name '{name}'"),
            ));
        }

        let count = block.u32_or("count", 1)?;
        validate_agent_pool_count(count, &block.field("count"))?;

        let vm_size = match block.string("vm_size")? {
            "" => DEFAULT_VM_SIZE.to_string(),
            size => size.to_string(),
        };

        let os_type = match block.string("os_type")? {
            "" => OsType::default(),
            raw => raw.parse::<OsType>().map_err(|_| {
                Error::validation(
                    block.field("os_type"),
                    format!("invalid os type: {raw}, expected one of: Linux, Windows"),
                )
            })?,
        };

        profiles.push(AgentPoolProfile {
            name: name.to_string(),
            count,
            vm_size,
            os_disk_size_gb: block.optional_scalar("os_disk_size")?,
            os_type,
        });
    }

    Ok(profiles)
}

/// Flatten pools into a block list, preserving order
///
/// `os_disk_size` is omitted when unset; `os_type` is always emitted.
pub fn flatten_agent_pool_profiles(profiles: &[AgentPoolProfile]) -> Vec<Value> {
    profiles
        .iter()
        .map(|profile| {
            let mut block = json!({
                "name": profile.name,
                "count": profile.count,
                "vm_size": profile.vm_size,
                "os_type": profile.os_type.to_string(),
            });
            if let Some(map) = block.as_object_mut() {
                insert_optional_scalar(map, "os_disk_size", profile.os_disk_size_gb);
            }
            block
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::OptionalScalar;

    fn data(blocks: Value) -> ResourceData {
        let mut d = ResourceData::new();
        d.set(AGENT_POOL_PROFILES, blocks);
        d
    }

    fn pool_block(name: &str, count: u32, os_disk_size: u32, windows: bool) -> Value {
        let mut block = json!({
            "name": name,
            "count": count,
            "vm_size": "Standard_D2_v2",
            "os_type": if windows { "Windows" } else { "Linux" },
        });
        if os_disk_size != 0 {
            block["os_disk_size"] = json!(os_disk_size);
        }
        block
    }

    #[test]
    fn expands_pools_in_order() {
        let d = data(json!([
            pool_block("agentpool1", 1, 0, false),
            pool_block("agentpool2", 2, 30, true),
        ]));
        let profiles = expand_agent_pool_profiles(&d).unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "agentpool1");
        assert_eq!(profiles[0].count, 1);
        assert!(profiles[0].os_disk_size_gb.is_unset());
        assert_eq!(profiles[0].os_type, OsType::Linux);
        assert_eq!(profiles[1].count, 2);
        assert_eq!(profiles[1].os_disk_size_gb.get(), Some(30));
        assert_eq!(profiles[1].os_type, OsType::Windows);
    }

    #[test]
    fn absent_os_type_defaults_to_linux() {
        let d = data(json!([{"name": "agentpool1", "count": 3}]));
        let profiles = expand_agent_pool_profiles(&d).unwrap();
        assert_eq!(profiles[0].os_type, OsType::Linux);
        assert_eq!(profiles[0].vm_size, DEFAULT_VM_SIZE);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let d = data(json!([
            pool_block("agentpool1", 1, 0, false),
            pool_block("agentpool1", 2, 0, false),
        ]));
        let err = expand_agent_pool_profiles(&d).unwrap_err();
        assert_eq!(err.field(), Some("agent_pool_profiles.1.name"));
        assert!(err.to_string().contains("duplicate agent pool name"));
    }

    #[test]
    fn invalid_pool_fields_name_the_failing_block() {
        let d = data(json!([pool_block("agentpool1", 1, 0, false), {"count": 1}]));
        assert_eq!(
            expand_agent_pool_profiles(&d).unwrap_err().field(),
            Some("agent_pool_profiles.1.name")
        );

        let d = data(json!([pool_block("agentpool1", 101, 0, false)]));
        assert_eq!(
            expand_agent_pool_profiles(&d).unwrap_err().field(),
            Some("agent_pool_profiles.0.count")
        );

        let d = data(json!([{"name": "agentpool1", "os_type": "Plan9"}]));
        assert_eq!(
            expand_agent_pool_profiles(&d).unwrap_err().field(),
            Some("agent_pool_profiles.0.os_type")
        );
    }

    #[test]
    fn no_pools_is_rejected() {
        assert!(expand_agent_pool_profiles(&ResourceData::new()).is_err());
        assert!(expand_agent_pool_profiles(&data(json!([]))).is_err());
    }

    #[test]
    fn flatten_elides_unset_disk_size_per_pool() {
        let profiles = vec![
            AgentPoolProfile {
                name: "agentpool1".to_string(),
                count: 1,
                vm_size: "Standard_D2_v2".to_string(),
                os_disk_size_gb: OptionalScalar::UNSET,
                os_type: OsType::Linux,
            },
            AgentPoolProfile {
                name: "agentpool2".to_string(),
                count: 1,
                vm_size: "Standard_D2_v2".to_string(),
                os_disk_size_gb: OptionalScalar::new(200),
                os_type: OsType::Linux,
            },
        ];
        let flattened = flatten_agent_pool_profiles(&profiles);

        assert_eq!(flattened[0]["count"], 1);
        assert!(flattened[0].get("os_disk_size").is_none());
        assert_eq!(flattened[1]["name"], "agentpool2");
        assert_eq!(flattened[1]["os_disk_size"], 200);
    }

    #[test]
    fn round_trip_preserves_os_type_and_order() {
        let d = data(json!([
            pool_block("windowspool1", 2, 0, true),
            pool_block("agentpool1", 5, 64, false),
        ]));
        let profiles = expand_agent_pool_profiles(&d).unwrap();
        let again = expand_agent_pool_profiles(&data(Value::Array(flatten_agent_pool_profiles(
            &profiles,
        ))))
        .unwrap();
        assert_eq!(again, profiles);
    }
}
