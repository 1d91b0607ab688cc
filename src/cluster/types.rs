//! Supporting types for the cluster specification

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::Error;

/// VM size used when a profile does not name one
pub const DEFAULT_VM_SIZE: &str = "Standard_D2_v2";

/// Master replica counts the control plane can run with
pub const VALID_MASTER_COUNTS: [u32; 3] = [1, 3, 5];

/// Smallest agent pool
pub const MIN_AGENT_POOL_COUNT: u32 = 1;

/// Largest agent pool
pub const MAX_AGENT_POOL_COUNT: u32 = 100;

/// Longest agent pool name the template generator accepts
pub const MAX_AGENT_POOL_NAME_LEN: usize = 12;

/// Pool names that would shadow the master profile's template parameters
pub const RESERVED_AGENT_POOL_NAMES: [&str; 1] = ["master"];

/// An integer override that is either set to a non-zero value or unset
///
/// Zero is never stored: it reads as "use the provider default", and the
/// flattened form of an unset value is an absent key rather than `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct OptionalScalar(Option<NonZeroU32>);

impl OptionalScalar {
    /// The unset value
    pub const UNSET: Self = Self(None);

    /// Wrap a raw value, treating zero as unset
    pub fn new(value: u32) -> Self {
        Self(NonZeroU32::new(value))
    }

    /// The override, if set
    pub fn get(&self) -> Option<u32> {
        self.0.map(NonZeroU32::get)
    }

    /// Returns true if no override is set
    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<u32>> for OptionalScalar {
    fn from(value: Option<u32>) -> Self {
        Self(value.and_then(NonZeroU32::new))
    }
}

/// OS disk size override in GB
pub type OsDiskSizeGb = OptionalScalar;

/// Operating system of an agent pool
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum OsType {
    /// Linux nodes (default)
    #[default]
    Linux,
    /// Windows nodes
    Windows,
}

impl std::str::FromStr for OsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            _ => Err(Error::validation(
                "os_type",
                format!("invalid os type: {s}, expected one of: Linux, Windows"),
            )),
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::Windows => write!(f, "Windows"),
        }
    }
}

/// Ordered set of SSH public keys, deduplicated by key material
///
/// Keys keep first-insertion order. Surrounding whitespace is not part of the
/// key material, so a key pasted with a trailing newline equals the same key
/// without it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct SshKeySet {
    keys: Vec<String>,
}

impl SshKeySet {
    /// Create an empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning false if an equal key is already present
    pub fn insert(&mut self, key: impl AsRef<str>) -> bool {
        let key = key.as_ref().trim();
        if self.contains(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    /// Returns true if the set holds this key material
    pub fn contains(&self, key: &str) -> bool {
        let key = key.trim();
        self.keys.iter().any(|k| k == key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set has no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate keys in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SshKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<'de> Deserialize<'de> for SshKeySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<String>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}

/// Identity and placement of a cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIdentity {
    /// Deployment name
    pub name: String,

    /// Resource group the cluster is deployed into
    pub resource_group: String,

    /// Normalized region name (e.g. `southcentralus`)
    pub location: String,

    /// Kubernetes version (`<major>.<minor>.<patch>`)
    pub kubernetes_version: String,

    /// Free-form tags applied to the deployment
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Admin access to Linux nodes
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinuxProfile {
    /// Admin user created on every node
    pub admin_username: String,

    /// Authorized SSH public keys
    pub ssh_keys: SshKeySet,
}

/// Credentials the cluster uses to call the cloud API
///
/// `Debug` never prints the secret. Serialization does, since the serialized
/// form feeds the deployment parameters.
#[derive(Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    /// Application (client) id
    pub client_id: String,

    /// Client secret
    pub client_secret: String,
}

impl fmt::Debug for ServicePrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePrincipal")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Control plane replica set
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    /// Number of masters (1, 3 or 5)
    pub count: u32,

    /// DNS prefix of the master endpoint
    pub dns_prefix: String,

    /// VM size of master nodes
    pub vm_size: String,

    /// OS disk size override
    #[serde(default, skip_serializing_if = "OptionalScalar::is_unset")]
    pub os_disk_size_gb: OsDiskSizeGb,

    /// Fully-qualified domain name, known only after provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

impl MasterProfile {
    /// Validates the master profile
    pub fn validate(&self) -> Result<(), Error> {
        validate_master_count(self.count, "master_profile.0.count")?;
        if self.dns_prefix.is_empty() {
            return Err(Error::validation(
                "master_profile.0.dns_name_prefix",
                "must not be empty",
            ));
        }
        if self.vm_size.is_empty() {
            return Err(Error::validation("master_profile.0.vm_size", "must not be empty"));
        }
        Ok(())
    }
}

/// A named group of worker nodes
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    /// Pool name, unique within the cluster
    pub name: String,

    /// Number of nodes (1 to 100)
    pub count: u32,

    /// VM size of pool nodes
    pub vm_size: String,

    /// OS disk size override
    #[serde(default, skip_serializing_if = "OptionalScalar::is_unset")]
    pub os_disk_size_gb: OsDiskSizeGb,

    /// Node operating system
    #[serde(default)]
    pub os_type: OsType,
}

impl AgentPoolProfile {
    /// Validates the pool; `index` is its position in the pool list
    pub fn validate(&self, index: usize) -> Result<(), Error> {
        let field = |name: &str| format!("agent_pool_profiles.{index}.{name}");
        validate_agent_pool_name(&self.name, &field("name"))?;
        validate_agent_pool_count(self.count, &field("count"))?;
        if self.vm_size.is_empty() {
            return Err(Error::validation(field("vm_size"), "must not be empty"));
        }
        Ok(())
    }
}

/// Validates a master replica count: only 1, 3 or 5 masters are supported
pub fn validate_master_count(count: u32, field: &str) -> Result<(), Error> {
    if !VALID_MASTER_COUNTS.contains(&count) {
        return Err(Error::validation(
            field,
            format!("master count must be 1, 3 or 5, got {count}"),
        ));
    }
    Ok(())
}

/// Validates an agent pool node count (1 to 100 inclusive)
pub fn validate_agent_pool_count(count: u32, field: &str) -> Result<(), Error> {
    if !(MIN_AGENT_POOL_COUNT..=MAX_AGENT_POOL_COUNT).contains(&count) {
        return Err(Error::validation(
            field,
            format!(
                "agent pool count must be between {MIN_AGENT_POOL_COUNT} and {MAX_AGENT_POOL_COUNT}, got {count}"
            ),
        ));
    }
    Ok(())
}

/// Validates an agent pool name
///
/// Names start with a lowercase letter, contain only lowercase letters and
/// digits, and are at most [`MAX_AGENT_POOL_NAME_LEN`] characters long.
/// Pool names prefix template parameters, so [`RESERVED_AGENT_POOL_NAMES`]
/// are refused.
pub fn validate_agent_pool_name(name: &str, field: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    if name.len() > MAX_AGENT_POOL_NAME_LEN {
        return Err(Error::validation(
            field,
            format!("agent pool name '{name}' is longer than {MAX_AGENT_POOL_NAME_LEN} characters"),
        ));
    }
    let starts_with_letter = name.starts_with(|c: char| c.is_ascii_lowercase());
    let identifier_safe = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !starts_with_letter || !identifier_safe {
        return Err(Error::validation(
            field,
            format!(
                "agent pool name '{name}' must start with a lowercase letter and contain only lowercase letters and digits"
            ),
        ));
    }
    if RESERVED_AGENT_POOL_NAMES.contains(&name) {
        return Err(Error::validation(field, format!("agent pool name '{name}' is reserved")));
    }
    Ok(())
}
