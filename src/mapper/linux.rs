//! `linux_profile` block

use serde_json::{json, Value};

use super::attrs::ResourceData;
use crate::cluster::{LinuxProfile, SshKeySet};
use crate::{Error, Result};

/// Attribute key of the block
pub const LINUX_PROFILE: &str = "linux_profile";

/// Build a [`LinuxProfile`] from `linux_profile = [{ admin_username, ssh = [{ key_data }] }]`
///
/// Identical keys collapse to one entry.
pub fn expand_linux_profile(data: &ResourceData) -> Result<LinuxProfile> {
    let block = data.single_block(LINUX_PROFILE)?;
    let admin_username = block.required_string("admin_username")?;

    let mut ssh_keys = SshKeySet::new();
    for key in block.blocks("ssh")? {
        ssh_keys.insert(key.required_string("key_data")?);
    }
    if ssh_keys.is_empty() {
        return Err(Error::validation(
            block.field("ssh"),
            "at least one SSH public key is required",
        ));
    }

    Ok(LinuxProfile {
        admin_username: admin_username.to_string(),
        ssh_keys,
    })
}

/// Flatten a [`LinuxProfile`] into a single-element block list
pub fn flatten_linux_profile(profile: &LinuxProfile) -> Vec<Value> {
    let ssh: Vec<Value> = profile
        .ssh_keys
        .iter()
        .map(|key| json!({ "key_data": key }))
        .collect();
    vec![json!({
        "admin_username": profile.admin_username,
        "ssh": ssh,
    })]
}
