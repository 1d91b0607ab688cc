//! Planning in-place changes to a deployed cluster
//!
//! Only three things change in place: the Kubernetes version, agent pool
//! counts and tags. Everything else forces a new deployment, reported as
//! the attribute paths that changed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::ClusterSpec;
use crate::config::ProviderConfig;
use crate::naming;
use crate::version;
use crate::{Error, Result};

/// Identifier of a cluster deployment
///
/// Formatted as `/subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Resources/deployments/<name>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DeploymentId {
    /// Subscription the deployment lives in
    pub subscription_id: String,
    /// Resource group of the deployment
    pub resource_group: String,
    /// Deployment name
    pub name: String,
}

impl DeploymentId {
    /// Create an identifier from its parts
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// Parse an identifier string
    pub fn parse(id: &str) -> Result<Self> {
        id.parse()
    }
}

impl FromStr for DeploymentId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let malformed = || Error::parse(format!("malformed deployment id '{id}'"));
        let segments: Vec<&str> = id.trim().trim_start_matches('/').split('/').collect();
        let [subscriptions, sub, groups, rg, providers, namespace, deployments, name] =
            segments.as_slice()
        else {
            return Err(malformed());
        };

        let keywords = [
            (subscriptions, "subscriptions"),
            (groups, "resourceGroups"),
            (providers, "providers"),
            (namespace, "Microsoft.Resources"),
            (deployments, "deployments"),
        ];
        if keywords
            .iter()
            .any(|(segment, keyword)| !segment.eq_ignore_ascii_case(keyword))
        {
            return Err(malformed());
        }
        if [sub, rg, name].iter().any(|part| part.is_empty()) {
            return Err(malformed());
        }

        Ok(Self::new(*sub, *rg, *name))
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Resources/deployments/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

/// Request to change one agent pool's node count
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScaleRequest {
    /// Subscription of the deployment
    pub subscription_id: String,
    /// Resource group of the deployment
    pub resource_group: String,
    /// Deployment name
    pub deployment_name: String,
    /// Region of the deployment
    pub location: String,
    /// Service principal the request authenticates as
    pub client_id: String,
    /// Position of the pool in the pool list
    pub agent_pool_index: usize,
    /// Name of the pool
    pub agent_pool_name: String,
    /// Node count after scaling
    pub desired_agent_count: u32,
}

/// Request to move the cluster to a new Kubernetes version
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradeRequest {
    /// Subscription of the deployment
    pub subscription_id: String,
    /// Resource group of the deployment
    pub resource_group: String,
    /// Deployment name
    pub deployment_name: String,
    /// Region of the deployment
    pub location: String,
    /// Service principal the request authenticates as
    pub client_id: String,
    /// Target version
    pub upgrade_version: String,
}

/// One in-place change to a deployed cluster
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum ClusterOperation {
    /// Upgrade Kubernetes
    Upgrade(UpgradeRequest),
    /// Resize an agent pool
    Scale(ScaleRequest),
    /// Replace the deployment's tags
    UpdateTags {
        /// The complete new tag set
        tags: BTreeMap<String, String>,
    },
}

/// Result of comparing a deployed cluster with its desired spec
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlan {
    /// Changed attribute paths that cannot be applied in place
    pub requires_replacement: Vec<String>,
    /// In-place operations, in the order they must run
    pub operations: Vec<ClusterOperation>,
}

impl UpdatePlan {
    /// Returns true if the deployment must be recreated
    pub fn requires_replacement(&self) -> bool {
        !self.requires_replacement.is_empty()
    }

    /// Returns true if nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.requires_replacement.is_empty() && self.operations.is_empty()
    }
}

/// Attribute paths whose change forces a new deployment
fn replacement_paths(current: &ClusterSpec, desired: &ClusterSpec) -> Vec<String> {
    let mut paths = Vec::new();
    let mut check = |changed: bool, path: String| {
        if changed {
            paths.push(path);
        }
    };

    let (cur, des) = (&current.identity, &desired.identity);
    check(cur.name != des.name, "name".to_string());
    check(cur.resource_group != des.resource_group, "resource_group".to_string());
    check(
        naming::normalize_location(&cur.location) != naming::normalize_location(&des.location),
        "location".to_string(),
    );

    let (cur, des) = (&current.linux_profile, &desired.linux_profile);
    check(
        cur.admin_username != des.admin_username,
        "linux_profile.0.admin_username".to_string(),
    );
    check(cur.ssh_keys != des.ssh_keys, "linux_profile.0.ssh".to_string());

    check(
        current.service_principal.client_id != desired.service_principal.client_id,
        "service_principal.0.client_id".to_string(),
    );

    let (cur, des) = (&current.master_profile, &desired.master_profile);
    check(cur.count != des.count, "master_profile.0.count".to_string());
    check(
        cur.dns_prefix != des.dns_prefix,
        "master_profile.0.dns_name_prefix".to_string(),
    );
    check(cur.vm_size != des.vm_size, "master_profile.0.vm_size".to_string());
    check(
        cur.os_disk_size_gb != des.os_disk_size_gb,
        "master_profile.0.os_disk_size".to_string(),
    );

    if current.agent_pool_profiles.len() != desired.agent_pool_profiles.len() {
        check(true, "agent_pool_profiles".to_string());
    } else {
        let pools = current.agent_pool_profiles.iter().zip(&desired.agent_pool_profiles);
        for (i, (cur, des)) in pools.enumerate() {
            let field = |name: &str| format!("agent_pool_profiles.{i}.{name}");
            check(cur.name != des.name, field("name"));
            check(cur.vm_size != des.vm_size, field("vm_size"));
            check(cur.os_type != des.os_type, field("os_type"));
            check(cur.os_disk_size_gb != des.os_disk_size_gb, field("os_disk_size"));
        }
    }

    paths
}

/// Plan how to move `deployment` from `current` to `desired`
///
/// A version change must be supported by `config` and allowed by the upgrade
/// policy, otherwise nothing is planned and the rule is returned as an error.
/// The upgrade always runs before any scale operation.
pub fn plan_update(
    deployment: &DeploymentId,
    current: &ClusterSpec,
    desired: &ClusterSpec,
    config: &ProviderConfig,
) -> Result<UpdatePlan> {
    let version_changed =
        current.identity.kubernetes_version != desired.identity.kubernetes_version;
    if version_changed {
        config
            .supported_versions
            .check(&desired.identity.kubernetes_version)?;
    }

    let requires_replacement = replacement_paths(current, desired);
    if !requires_replacement.is_empty() {
        info!(
            deployment = %deployment.name,
            fields = ?requires_replacement,
            "Update requires a new deployment"
        );
        return Ok(UpdatePlan {
            requires_replacement,
            operations: Vec::new(),
        });
    }

    let location = desired.identity.location.clone();
    let client_id = desired.service_principal.client_id.clone();
    let mut operations = Vec::new();

    if version_changed {
        version::check_upgrade(
            &current.identity.kubernetes_version,
            &desired.identity.kubernetes_version,
        )?;
        info!(
            deployment = %deployment.name,
            from = %current.identity.kubernetes_version,
            to = %desired.identity.kubernetes_version,
            "Planning upgrade"
        );
        operations.push(ClusterOperation::Upgrade(UpgradeRequest {
            subscription_id: deployment.subscription_id.clone(),
            resource_group: deployment.resource_group.clone(),
            deployment_name: deployment.name.clone(),
            location: location.clone(),
            client_id: client_id.clone(),
            upgrade_version: desired.identity.kubernetes_version.clone(),
        }));
    }

    let pools = current.agent_pool_profiles.iter().zip(&desired.agent_pool_profiles);
    for (index, (cur, des)) in pools.enumerate() {
        if cur.count == des.count {
            continue;
        }
        info!(
            deployment = %deployment.name,
            pool = %des.name,
            from = cur.count,
            to = des.count,
            "Planning scale"
        );
        operations.push(ClusterOperation::Scale(ScaleRequest {
            subscription_id: deployment.subscription_id.clone(),
            resource_group: deployment.resource_group.clone(),
            deployment_name: deployment.name.clone(),
            location: location.clone(),
            client_id: client_id.clone(),
            agent_pool_index: index,
            agent_pool_name: des.name.clone(),
            desired_agent_count: des.count,
        }));
    }

    if current.identity.tags != desired.identity.tags {
        debug!(deployment = %deployment.name, "Planning tag update");
        operations.push(ClusterOperation::UpdateTags {
            tags: desired.identity.tags.clone(),
        });
    }

    Ok(UpdatePlan {
        requires_replacement,
        operations,
    })
}
