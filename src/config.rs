//! Provider configuration
//!
//! Holds the supported Kubernetes release table and the version used when a
//! cluster does not pin one. Loaded from YAML:
//!
//! ```yaml
//! supportedVersions: ["1.8", "1.9", "1.10"]
//! defaultKubernetesVersion: "1.9.8"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::version::{KubernetesVersion, SupportedVersions};
use crate::{Error, Result};

/// Kubernetes version used when the declarative input leaves it empty
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.8.13";

/// Configuration shared by every cluster the provider manages
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Release lines a new cluster may be created with
    #[serde(default)]
    pub supported_versions: SupportedVersions,

    /// Version used when `kubernetes_version` is absent or empty
    #[serde(default = "default_kubernetes_version")]
    pub default_kubernetes_version: KubernetesVersion,
}

fn default_kubernetes_version() -> KubernetesVersion {
    KubernetesVersion::new(1, 8, 13)
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            supported_versions: SupportedVersions::default(),
            default_kubernetes_version: default_kubernetes_version(),
        }
    }
}

impl ProviderConfig {
    /// Parse and validate a configuration document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid provider config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read provider config {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&yaml)?;
        debug!(
            path = %path.display(),
            release_lines = config.supported_versions.lines().len(),
            default_version = %config.default_kubernetes_version,
            "Loaded provider config"
        );
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.supported_versions.is_empty() {
            return Err(Error::config("supportedVersions must not be empty"));
        }
        if !self
            .supported_versions
            .contains(&self.default_kubernetes_version)
        {
            return Err(Error::config(format!(
                "defaultKubernetesVersion {} is not in supportedVersions",
                self.default_kubernetes_version
            )));
        }
        Ok(())
    }

    /// Resolve the version a new cluster is created with
    ///
    /// Empty input selects the default; anything else must be supported.
    pub fn resolve_kubernetes_version(&self, requested: &str) -> Result<KubernetesVersion> {
        if requested.trim().is_empty() {
            return Ok(self.default_kubernetes_version);
        }
        self.supported_versions.check(requested)
    }
}
