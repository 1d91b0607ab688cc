//! Deployment template generation and update planning
//!
//! A [`TemplateGenerator`] turns a validated [`ClusterSpec`] into a rendered
//! deployment template and parameters file. [`generate_template`] runs the
//! whole create path: expand the resource attributes, then render.
//!
//! Changes to an existing deployment go through [`plan_update`], which
//! decides between in-place operations (upgrade, scale, tag update) and a
//! replacement, consulting the upgrade policy before anything is planned.
//!
//! # Example
//!
//! ```text
//! let data = ResourceData::from_yaml(&attributes)?;
//! let rendered = generate_template(&data, &ProviderConfig::default(), &ArmTemplateGenerator::new())?;
//! ```

mod arm;
mod operations;

pub use arm::ArmTemplateGenerator;
pub use operations::{
    plan_update, ClusterOperation, DeploymentId, ScaleRequest, UpdatePlan, UpgradeRequest,
};

#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tracing::info;

use crate::cluster::ClusterSpec;
use crate::config::ProviderConfig;
use crate::mapper::{expand_cluster_spec, ResourceData};
use crate::Result;

/// Rendered deployment template and its parameters file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedTemplate {
    /// Deployment template (JSON)
    pub template: String,
    /// Parameters file (JSON); contains the service principal secret
    pub parameters: String,
}

/// Renders a deployment template from a cluster spec
///
/// Implementations receive a spec that has already been validated.
#[cfg_attr(test, automock)]
pub trait TemplateGenerator: Send + Sync {
    /// Render the template and parameters for `spec`
    fn generate(&self, spec: &ClusterSpec) -> Result<RenderedTemplate>;
}

/// Expand resource attributes and render them with `generator`
///
/// Nothing is rendered if expansion fails.
pub fn generate_template<G: TemplateGenerator + ?Sized>(
    data: &ResourceData,
    config: &ProviderConfig,
    generator: &G,
) -> Result<RenderedTemplate> {
    let spec = expand_cluster_spec(data, config)?;
    let rendered = generator.generate(&spec)?;
    info!(
        cluster = %spec.identity.name,
        resource_group = %spec.identity.resource_group,
        version = %spec.identity.kubernetes_version,
        "Generated deployment template"
    );
    Ok(rendered)
}
