//! `master_profile` block

use serde_json::{json, Value};

use super::attrs::{insert_optional_scalar, ResourceData};
use crate::cluster::{validate_master_count, MasterProfile, DEFAULT_VM_SIZE};
use crate::naming;
use crate::Result;

/// Attribute key of the block
pub const MASTER_PROFILE: &str = "master_profile";

/// Build a [`MasterProfile`] from `master_profile = [{ count, dns_name_prefix, vm_size, os_disk_size }]`
///
/// `count` defaults to 1 and `vm_size` to [`DEFAULT_VM_SIZE`]. `fqdn` is
/// computed by the deployment and ignored here.
pub fn expand_master_profile(data: &ResourceData) -> Result<MasterProfile> {
    let block = data.single_block(MASTER_PROFILE)?;

    let count = block.u32_or("count", 1)?;
    validate_master_count(count, &block.field("count"))?;

    let dns_prefix = block.required_string("dns_name_prefix")?.to_string();
    let vm_size = match block.string("vm_size")? {
        "" => DEFAULT_VM_SIZE.to_string(),
        size => size.to_string(),
    };

    Ok(MasterProfile {
        count,
        dns_prefix,
        vm_size,
        os_disk_size_gb: block.optional_scalar("os_disk_size")?,
        fqdn: None,
    })
}

/// Flatten a [`MasterProfile`] into a single-element block list
///
/// `fqdn` is derived from the DNS prefix and `location` when the deployment
/// has not reported one. `os_disk_size` is omitted when unset.
pub fn flatten_master_profile(profile: &MasterProfile, location: &str) -> Vec<Value> {
    let fqdn = match profile.fqdn.as_deref() {
        Some(fqdn) if !fqdn.is_empty() => fqdn.to_string(),
        _ => naming::master_fqdn(&profile.dns_prefix, location),
    };

    let mut block = json!({
        "count": profile.count,
        "dns_name_prefix": profile.dns_prefix,
        "vm_size": profile.vm_size,
        "fqdn": fqdn,
    });
    if let Some(map) = block.as_object_mut() {
        insert_optional_scalar(map, "os_disk_size", profile.os_disk_size_gb);
    }
    vec![block]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::OptionalScalar;

    fn data(block: Value) -> ResourceData {
        let mut d = ResourceData::new();
        d.set(MASTER_PROFILE, block);
        d
    }

    fn sample() -> MasterProfile {
        MasterProfile {
            count: 1,
            dns_prefix: "testPrefix".to_string(),
            vm_size: "Standard_D2_v2".to_string(),
            os_disk_size_gb: OptionalScalar::UNSET,
            fqdn: None,
        }
    }

    #[test]
    fn expands_prefix_and_vm_size() {
        let d = data(json!([{
            "count": 1,
            "dns_name_prefix": "masterDNSPrefix",
            "vm_size": "Standard_D2_v2",
            "fqdn": "f/q/d/n"
        }]));
        let profile = expand_master_profile(&d).unwrap();
        assert_eq!(profile.dns_prefix, "masterDNSPrefix");
        assert_eq!(profile.vm_size, "Standard_D2_v2");
        assert_eq!(profile.fqdn, None);
        assert!(profile.os_disk_size_gb.is_unset());
    }

    #[test]
    fn missing_vm_size_and_count_use_defaults() {
        let d = data(json!([{"dns_name_prefix": "p", "vm_size": ""}]));
        let profile = expand_master_profile(&d).unwrap();
        assert_eq!(profile.count, 1);
        assert_eq!(profile.vm_size, DEFAULT_VM_SIZE);
    }

    #[test]
    fn even_count_is_rejected() {
        let d = data(json!([{"count": 2, "dns_name_prefix": "p"}]));
        let err = expand_master_profile(&d).unwrap_err();
        assert_eq!(err.field(), Some("master_profile.0.count"));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let d = data(json!([{"count": 3}]));
        let err = expand_master_profile(&d).unwrap_err();
        assert_eq!(err.field(), Some("master_profile.0.dns_name_prefix"));
    }

    #[test]
    fn flatten_omits_unset_disk_size() {
        let flattened = flatten_master_profile(&sample(), "southcentralus");
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0]["count"], 1);
        assert!(flattened[0].get("os_disk_size").is_none());
    }

    #[test]
    fn flatten_includes_set_disk_size() {
        let profile = MasterProfile {
            os_disk_size_gb: OptionalScalar::new(200),
            ..sample()
        };
        let flattened = flatten_master_profile(&profile, "southcentralus");
        assert_eq!(flattened[0]["os_disk_size"], 200);
    }

    #[test]
    fn flatten_derives_fqdn_when_unknown() {
        let flattened = flatten_master_profile(&sample(), "South Central US");
        assert_eq!(
            flattened[0]["fqdn"],
            "testPrefix.southcentralus.cloudapp.azure.com"
        );

        let known = MasterProfile {
            fqdn: Some("abcdefg".to_string()),
            ..sample()
        };
        assert_eq!(flatten_master_profile(&known, "eastus")[0]["fqdn"], "abcdefg");
    }

    #[test]
    fn round_trip_preserves_profile() {
        for disk in [OptionalScalar::UNSET, OptionalScalar::new(128)] {
            let profile = MasterProfile {
                count: 3,
                os_disk_size_gb: disk,
                ..sample()
            };
            let d = data(Value::Array(flatten_master_profile(&profile, "eastus")));
            assert_eq!(expand_master_profile(&d).unwrap(), profile);
        }
    }
}
