//! Default template generator producing ARM deployment JSON
//!
//! The template declares one parameter per cluster setting and the parameters
//! file fills them in. Resources are left to the external deployment engine;
//! this generator only fixes the contract between the spec and that engine.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use super::{RenderedTemplate, TemplateGenerator};
use crate::cluster::{ClusterSpec, OptionalScalar};
use crate::naming;
use crate::{Error, Result};

/// Schema of ARM deployment templates
pub const DEPLOYMENT_TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#";

/// Schema of ARM deployment parameter files
pub const DEPLOYMENT_PARAMETERS_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2015-01-01/deploymentParameters.json#";

/// Content version stamped on both documents
pub const CONTENT_VERSION: &str = "1.0.0.0";

/// One declared template parameter with its value
struct Parameter {
    name: String,
    kind: &'static str,
    value: Value,
}

impl Parameter {
    fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "string",
            value: Value::String(value.into()),
        }
    }

    fn secure(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "securestring",
            ..Self::string(name, value)
        }
    }

    fn int(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            kind: "int",
            value: json!(value),
        }
    }

    fn array(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind: "array",
            value: Value::Array(values),
        }
    }
}

/// Push an int parameter only when the override is set
fn push_optional(params: &mut Vec<Parameter>, name: String, value: OptionalScalar) {
    if let Some(v) = value.get() {
        params.push(Parameter::int(name, v));
    }
}

fn ensure_unique(params: &[Parameter]) -> Result<()> {
    let mut seen = BTreeSet::new();
    match params.iter().find(|p| !seen.insert(p.name.as_str())) {
        Some(repeated) => Err(Error::template(format!(
            "duplicate template parameter '{}'",
            repeated.name
        ))),
        None => Ok(()),
    }
}

/// Generates ARM templates for a [`ClusterSpec`]
#[derive(Clone, Debug, Default)]
pub struct ArmTemplateGenerator;

impl ArmTemplateGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }

    /// Declares the parameters for `spec`
    ///
    /// `sshRSAPublicKey` carries the primary key and `sshPublicKeys` every
    /// key in the set. Names must be unique: a repeat would let one value
    /// overwrite another in the parameters file.
    fn parameters(&self, spec: &ClusterSpec) -> Result<Vec<Parameter>> {
        let master = &spec.master_profile;
        let ssh_keys = &spec.linux_profile.ssh_keys;
        let primary_key = ssh_keys
            .iter()
            .next()
            .ok_or_else(|| Error::template("linux profile has no SSH public key"))?;

        let mut params = vec![
            Parameter::string("dnsNamePrefix", &master.dns_prefix),
            Parameter::int("masterCount", master.count),
            Parameter::string("masterVMSize", &master.vm_size),
        ];
        push_optional(&mut params, "masterOSDiskSizeGB".to_string(), master.os_disk_size_gb);
        params.extend([
            Parameter::string("linuxAdminUsername", &spec.linux_profile.admin_username),
            Parameter::string("sshRSAPublicKey", primary_key),
            Parameter::array(
                "sshPublicKeys",
                ssh_keys.iter().map(|key| Value::String(key.to_string())).collect(),
            ),
            Parameter::string("servicePrincipalClientId", &spec.service_principal.client_id),
            Parameter::secure(
                "servicePrincipalClientSecret",
                &spec.service_principal.client_secret,
            ),
            Parameter::string("kubernetesVersion", &spec.identity.kubernetes_version),
        ]);

        for pool in &spec.agent_pool_profiles {
            params.push(Parameter::int(format!("{}Count", pool.name), pool.count));
            params.push(Parameter::string(format!("{}VMSize", pool.name), &pool.vm_size));
            params.push(Parameter::string(
                format!("{}OSType", pool.name),
                pool.os_type.to_string(),
            ));
            push_optional(&mut params, format!("{}OSDiskSizeGB", pool.name), pool.os_disk_size_gb);
        }

        ensure_unique(&params)?;
        Ok(params)
    }

    fn template(&self, spec: &ClusterSpec, params: &[Parameter]) -> Value {
        let declared: Map<String, Value> = params
            .iter()
            .map(|p| (p.name.clone(), json!({ "type": p.kind })))
            .collect();
        let identity = &spec.identity;

        json!({
            "$schema": DEPLOYMENT_TEMPLATE_SCHEMA,
            "contentVersion": CONTENT_VERSION,
            "parameters": declared,
            "variables": {
                "location": identity.location,
                "storageAccountName": naming::storage_account_name(&identity.name),
                "fqdn": naming::master_fqdn(&spec.master_profile.dns_prefix, &identity.location),
                "tags": identity.tags,
            },
            "resources": [],
            "outputs": {
                "masterFQDN": {
                    "type": "string",
                    "value": "[variables('fqdn')]"
                }
            }
        })
    }

    fn parameters_file(&self, params: &[Parameter]) -> Value {
        let values: Map<String, Value> = params
            .iter()
            .map(|p| (p.name.clone(), json!({ "value": p.value })))
            .collect();

        json!({
            "$schema": DEPLOYMENT_PARAMETERS_SCHEMA,
            "contentVersion": CONTENT_VERSION,
            "parameters": values,
        })
    }
}

fn to_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::serialization(e.to_string()))
}

impl TemplateGenerator for ArmTemplateGenerator {
    fn generate(&self, spec: &ClusterSpec) -> Result<RenderedTemplate> {
        spec.validate()?;
        let params = self.parameters(spec)?;
        Ok(RenderedTemplate {
            template: to_pretty(&self.template(spec, &params))?,
            parameters: to_pretty(&self.parameters_file(&params))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{
        AgentPoolProfile, ClusterIdentity, LinuxProfile, MasterProfile, OsType, ServicePrincipal,
    };
    use std::collections::BTreeMap;

    fn pool(name: &str, os_disk_size: u32, os_type: OsType) -> AgentPoolProfile {
        AgentPoolProfile {
            name: name.to_string(),
            count: 2,
            vm_size: "Standard_D2_v2".to_string(),
            os_disk_size_gb: OptionalScalar::new(os_disk_size),
            os_type,
        }
    }

    fn sample_spec() -> ClusterSpec {
        ClusterSpec {
            identity: ClusterIdentity {
                name: "My-Cluster_01".to_string(),
                resource_group: "acctestRG".to_string(),
                location: "southcentralus".to_string(),
                kubernetes_version: "1.9.8".to_string(),
                tags: BTreeMap::from([("Environment".to_string(), "Production".to_string())]),
            },
            linux_profile: LinuxProfile {
                admin_username: "azureuser".to_string(),
                ssh_keys: ["ssh-rsa AAAA"].into_iter().collect(),
            },
            service_principal: ServicePrincipal {
                client_id: "client-id".to_string(),
                client_secret: "hunter2".to_string(),
            },
            master_profile: MasterProfile {
                count: 3,
                dns_prefix: "acctestmaster".to_string(),
                vm_size: "Standard_D2_v2".to_string(),
                os_disk_size_gb: OptionalScalar::UNSET,
                fqdn: None,
            },
            agent_pool_profiles: vec![
                pool("agentpool1", 0, OsType::Linux),
                pool("windowspool1", 128, OsType::Windows),
            ],
        }
    }

    fn render(spec: &ClusterSpec) -> (Value, Value) {
        let rendered = ArmTemplateGenerator::new().generate(spec).unwrap();
        (
            serde_json::from_str(&rendered.template).unwrap(),
            serde_json::from_str(&rendered.parameters).unwrap(),
        )
    }

    #[test]
    fn template_declares_every_parameter_it_fills() {
        let (template, parameters) = render(&sample_spec());
        let declared = template["parameters"].as_object().unwrap();
        let filled = parameters["parameters"].as_object().unwrap();
        assert_eq!(
            declared.keys().collect::<Vec<_>>(),
            filled.keys().collect::<Vec<_>>()
        );
        assert_eq!(template["contentVersion"], CONTENT_VERSION);
        assert_eq!(template["resources"], json!([]));
    }

    #[test]
    fn unset_disk_sizes_are_not_declared() {
        let (template, parameters) = render(&sample_spec());
        let declared = &template["parameters"];
        assert!(declared.get("masterOSDiskSizeGB").is_none());
        assert!(declared.get("agentpool1OSDiskSizeGB").is_none());
        assert_eq!(parameters["parameters"]["windowspool1OSDiskSizeGB"]["value"], 128);
    }

    #[test]
    fn pool_parameters_carry_counts_and_os_type() {
        let (_, parameters) = render(&sample_spec());
        let values = &parameters["parameters"];
        assert_eq!(values["masterCount"]["value"], 3);
        assert_eq!(values["agentpool1Count"]["value"], 2);
        assert_eq!(values["windowspool1OSType"]["value"], "Windows");
        assert_eq!(values["kubernetesVersion"]["value"], "1.9.8");
    }

    #[test]
    fn secret_is_a_securestring() {
        let (template, parameters) = render(&sample_spec());
        assert_eq!(
            template["parameters"]["servicePrincipalClientSecret"]["type"],
            "securestring"
        );
        assert_eq!(
            parameters["parameters"]["servicePrincipalClientSecret"]["value"],
            "hunter2"
        );
        assert!(!template.to_string().contains("hunter2"));
    }

    #[test]
    fn variables_use_derived_names() {
        let (template, _) = render(&sample_spec());
        let variables = &template["variables"];
        assert_eq!(variables["storageAccountName"], "mycluster01acc");
        assert_eq!(
            variables["fqdn"],
            "acctestmaster.southcentralus.cloudapp.azure.com"
        );
        assert_eq!(variables["tags"]["Environment"], "Production");
    }

    #[test]
    fn every_ssh_key_reaches_the_parameters() {
        let mut spec = sample_spec();
        spec.linux_profile.ssh_keys = ["ssh-rsa AAAA", "ssh-ed25519 BBBB"].into_iter().collect();

        let (template, parameters) = render(&spec);
        assert_eq!(template["parameters"]["sshPublicKeys"]["type"], "array");
        assert_eq!(
            parameters["parameters"]["sshPublicKeys"]["value"],
            json!(["ssh-rsa AAAA", "ssh-ed25519 BBBB"])
        );
        assert_eq!(parameters["parameters"]["sshRSAPublicKey"]["value"], "ssh-rsa AAAA");
    }

    fn master_named_pool() -> ClusterSpec {
        let mut spec = sample_spec();
        spec.master_profile.count = 1;
        spec.agent_pool_profiles = vec![AgentPoolProfile {
            name: "master".to_string(),
            count: 4,
            vm_size: "Standard_D16_v3".to_string(),
            os_disk_size_gb: OptionalScalar::UNSET,
            os_type: OsType::Linux,
        }];
        spec
    }

    #[test]
    fn pool_named_master_is_rejected() {
        let err = ArmTemplateGenerator::new()
            .generate(&master_named_pool())
            .unwrap_err();
        assert_eq!(err.field(), Some("agent_pool_profiles.0.name"));
    }

    #[test]
    fn repeated_parameter_names_are_an_error() {
        let err = ArmTemplateGenerator::new()
            .parameters(&master_named_pool())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Template(_)));
        assert!(err.to_string().contains("duplicate template parameter 'masterCount'"));
    }

    #[test]
    fn invalid_spec_is_rejected() {
        let mut spec = sample_spec();
        spec.agent_pool_profiles.clear();
        assert!(ArmTemplateGenerator::new().generate(&spec).is_err());
    }
}
