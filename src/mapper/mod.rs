//! Expand and flatten between declarative attributes and [`ClusterSpec`]
//!
//! Each block has an `expand_*` function that reads a [`ResourceData`] and
//! returns a typed value or a field-named [`Error::Validation`](crate::Error),
//! and a `flatten_*` function that produces the block list the host stores.
//! For every valid value `v`, `expand(flatten(v)) == v`; unset optional
//! integers flatten to an absent key and expand back to unset.
//!
//! Flattened attributes are the storage-safe form and carry secrets. Use
//! [`display_safe`] before printing or logging them.

mod agent_pool;
mod attrs;
mod linux;
mod master;
mod service_principal;
mod tags;

pub use agent_pool::{expand_agent_pool_profiles, flatten_agent_pool_profiles, AGENT_POOL_PROFILES};
pub use attrs::{display_safe, mask_sensitive, ResourceData, SENSITIVE_KEYS};
pub use linux::{expand_linux_profile, flatten_linux_profile, LINUX_PROFILE};
pub use master::{expand_master_profile, flatten_master_profile, MASTER_PROFILE};
pub use service_principal::{
    expand_service_principal, flatten_service_principal, SERVICE_PRINCIPAL,
};
pub use tags::{expand_tags, flatten_tags, TAGS};

use tracing::debug;

use crate::cluster::{ClusterIdentity, ClusterSpec};
use crate::config::ProviderConfig;
use crate::kubeconfig::{flatten_kube_config, ExpectedEndpoint};
use crate::naming;
use crate::Result;

/// Top-level attribute: deployment name
pub const NAME: &str = "name";
/// Top-level attribute: resource group
pub const RESOURCE_GROUP: &str = "resource_group";
/// Top-level attribute: region
pub const LOCATION: &str = "location";
/// Top-level attribute: Kubernetes version
pub const KUBERNETES_VERSION: &str = "kubernetes_version";
/// Computed attribute: credential block list
pub const KUBE_CONFIG: &str = "kube_config";
/// Computed attribute: raw kubeconfig document
pub const KUBE_CONFIG_RAW: &str = "kube_config_raw";

/// Build the full [`ClusterSpec`] from a resource's attributes
///
/// The location is normalized and an absent `kubernetes_version` takes the
/// configured default. The assembled spec is validated as a whole.
pub fn expand_cluster_spec(data: &ResourceData, config: &ProviderConfig) -> Result<ClusterSpec> {
    let root = data.root();
    let name = root.required_string(NAME)?;
    let resource_group = root.required_string(RESOURCE_GROUP)?;
    let location = naming::normalize_location(root.required_string(LOCATION)?);
    let kubernetes_version = config.resolve_kubernetes_version(root.string(KUBERNETES_VERSION)?)?;

    let spec = ClusterSpec {
        identity: ClusterIdentity {
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            location,
            kubernetes_version: kubernetes_version.to_string(),
            tags: expand_tags(data)?,
        },
        linux_profile: expand_linux_profile(data)?,
        service_principal: expand_service_principal(data)?,
        master_profile: expand_master_profile(data)?,
        agent_pool_profiles: expand_agent_pool_profiles(data)?,
    };
    spec.validate()?;

    debug!(
        cluster = %spec.identity.name,
        version = %spec.identity.kubernetes_version,
        pools = spec.agent_pool_profiles.len(),
        "Expanded cluster spec"
    );
    Ok(spec)
}

/// Flatten a [`ClusterSpec`] into the attributes the host stores
pub fn flatten_cluster_spec(spec: &ClusterSpec) -> ResourceData {
    let identity = &spec.identity;
    let mut data = ResourceData::new();
    data.set(NAME, identity.name.as_str());
    data.set(RESOURCE_GROUP, identity.resource_group.as_str());
    data.set(LOCATION, identity.location.as_str());
    data.set(KUBERNETES_VERSION, identity.kubernetes_version.as_str());
    data.set(LINUX_PROFILE, flatten_linux_profile(&spec.linux_profile));
    data.set(SERVICE_PRINCIPAL, flatten_service_principal(&spec.service_principal));
    data.set(
        MASTER_PROFILE,
        flatten_master_profile(&spec.master_profile, &identity.location),
    );
    data.set(AGENT_POOL_PROFILES, flatten_agent_pool_profiles(&spec.agent_pool_profiles));
    data.set(TAGS, flatten_tags(&identity.tags));
    data
}

/// Store the credentials of a deployed cluster on its attributes
///
/// Sets `kube_config_raw` to the document and `kube_config` to the derived
/// credential block. The document's endpoint is compared with the one derived
/// from the spec's DNS prefix and location.
pub fn set_kube_config(data: &mut ResourceData, spec: &ClusterSpec, raw: &str) -> Result<()> {
    let expected = ExpectedEndpoint::new(&spec.master_profile.dns_prefix, &spec.identity.location);
    let (raw, credentials) = flatten_kube_config(raw, Some(&expected))?;
    data.set(KUBE_CONFIG_RAW, raw);
    data.set(KUBE_CONFIG, credentials);
    Ok(())
}
