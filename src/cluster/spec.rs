//! The structured cluster specification consumed by template generation

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    AgentPoolProfile, ClusterIdentity, LinuxProfile, MasterProfile, ServicePrincipal,
};
use crate::Error;

/// Full specification of a cluster deployment
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Name, placement, version and tags
    pub identity: ClusterIdentity,

    /// Admin access to Linux nodes
    pub linux_profile: LinuxProfile,

    /// Cloud API credentials
    pub service_principal: ServicePrincipal,

    /// Control plane
    pub master_profile: MasterProfile,

    /// Worker pools, in declaration order
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
}

impl ClusterSpec {
    /// Validate the cluster specification
    pub fn validate(&self) -> Result<(), Error> {
        if self.identity.name.is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        if self.identity.resource_group.is_empty() {
            return Err(Error::validation("resource_group", "must not be empty"));
        }
        if self.identity.location.is_empty() {
            return Err(Error::validation("location", "must not be empty"));
        }

        if self.linux_profile.admin_username.is_empty() {
            return Err(Error::validation(
                "linux_profile.0.admin_username",
                "must not be empty",
            ));
        }
        if self.linux_profile.ssh_keys.is_empty() {
            return Err(Error::validation(
                "linux_profile.0.ssh",
                "at least one SSH public key is required",
            ));
        }

        if self.service_principal.client_id.is_empty() {
            return Err(Error::validation(
                "service_principal.0.client_id",
                "must not be empty",
            ));
        }
        if self.service_principal.client_secret.is_empty() {
            return Err(Error::validation(
                "service_principal.0.client_secret",
                "must not be empty",
            ));
        }

        self.master_profile.validate()?;

        if self.agent_pool_profiles.is_empty() {
            return Err(Error::validation(
                "agent_pool_profiles",
                "at least one agent pool is required",
            ));
        }
        let mut seen = BTreeSet::new();
        for (index, pool) in self.agent_pool_profiles.iter().enumerate() {
            pool.validate(index)?;
            if !seen.insert(pool.name.as_str()) {
                return Err(Error::validation(
                    format!("agent_pool_profiles.{index}.name"),
                    format!("duplicate agent pool name '{}'", pool.name),
                ));
            }
        }

        Ok(())
    }
}
