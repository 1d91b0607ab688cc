//! Error types for cluster spec mapping, version policy and kubeconfig extraction

use thiserror::Error;

use crate::version::KubernetesVersion;

/// Main error type for acsengine operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required attribute is missing or logically inconsistent
    #[error("validation error: {field}: {message}")]
    Validation {
        /// Attribute path of the offending field (e.g. `agent_pool_profiles.1.vm_size`)
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// Malformed external document or string
    #[error("parse error: {0}")]
    Parse(String),

    /// Version transition rejected by the upgrade policy
    #[error("upgrade policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    /// Well-formed version outside the supported release table
    #[error("unsupported kubernetes version: {0}")]
    UnsupportedVersion(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Provider configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Template generation error
    #[error("template error: {0}")]
    Template(String),
}

impl Error {
    /// Create a validation error for the given attribute path
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error with the given message
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an unsupported version error for the given version string
    pub fn unsupported_version(version: impl Into<String>) -> Self {
        Self::UnsupportedVersion(version.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a template error with the given message
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Attribute path this error is attributed to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// The upgrade rule a rejected version transition broke
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// Proposed version is older than the running one
    #[error("cannot downgrade from {current} to {proposed}")]
    Downgrade {
        /// Running version
        current: KubernetesVersion,
        /// Requested version
        proposed: KubernetesVersion,
    },

    /// Proposed version equals the running one
    #[error("cluster is already running {current}")]
    NoOp {
        /// Running version
        current: KubernetesVersion,
    },

    /// Proposed version changes the major component
    #[error("cannot change major version from {current} to {proposed}")]
    MajorJump {
        /// Running version
        current: KubernetesVersion,
        /// Requested version
        proposed: KubernetesVersion,
    },

    /// Proposed version skips one or more minor releases
    #[error("cannot upgrade from {current} to {proposed}: only one minor version at a time")]
    MultiMinorJump {
        /// Running version
        current: KubernetesVersion,
        /// Requested version
        proposed: KubernetesVersion,
    },
}
