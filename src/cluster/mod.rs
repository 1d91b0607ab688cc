//! Cluster data model
//!
//! Strongly typed form of a cluster deployment: identity, Linux access,
//! service principal, master profile and agent pools.

mod spec;
mod types;

pub use spec::ClusterSpec;
pub use types::{
    validate_agent_pool_count, validate_agent_pool_name, validate_master_count, AgentPoolProfile,
    ClusterIdentity, LinuxProfile, MasterProfile, OptionalScalar, OsDiskSizeGb, OsType,
    ServicePrincipal, SshKeySet, DEFAULT_VM_SIZE, MAX_AGENT_POOL_COUNT, MAX_AGENT_POOL_NAME_LEN,
    MIN_AGENT_POOL_COUNT, RESERVED_AGENT_POOL_NAMES, VALID_MASTER_COUNTS,
};
