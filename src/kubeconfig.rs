//! Cluster-admin kubeconfig parsing and credential extraction
//!
//! A successful deployment hands back a kubeconfig for the cluster admin.
//! This module parses it, selects the cluster and user entries the document
//! points at, and derives the [`ClusterCredentials`] surfaced back to the
//! declarative host.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::naming;
use crate::{Error, Result};

/// A named cluster entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NamedCluster {
    /// Entry name
    #[serde(default)]
    pub name: String,
    /// Connection details
    #[serde(default)]
    pub cluster: ClusterEntry,
}

/// Server address and trust material of a cluster entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterEntry {
    /// CA certificate data
    #[serde(rename = "certificate-authority-data", default)]
    pub certificate_authority_data: String,
    /// API server address
    #[serde(default)]
    pub server: String,
}

/// A named user entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NamedUser {
    /// Entry name
    #[serde(default)]
    pub name: String,
    /// Authentication material
    #[serde(default)]
    pub user: UserEntry,
}

/// Authentication material of a user entry
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserEntry {
    /// Client certificate data
    #[serde(rename = "client-certificate-data", default)]
    pub client_certificate_data: String,
    /// Client key data
    #[serde(rename = "client-key-data", default)]
    pub client_key_data: String,
    /// Bearer token
    #[serde(default)]
    pub token: String,
}

impl UserEntry {
    /// Returns true if the entry can authenticate: a token or a full cert/key pair
    pub fn has_auth_material(&self) -> bool {
        !self.token.is_empty()
            || (!self.client_certificate_data.is_empty() && !self.client_key_data.is_empty())
    }
}

impl fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEntry")
            .field("client_certificate_data", &self.client_certificate_data)
            .field("client_key_data", &redact(&self.client_key_data))
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// A named context entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NamedContext {
    /// Entry name
    #[serde(default)]
    pub name: String,
    /// Cluster/user pairing
    #[serde(default)]
    pub context: ContextEntry,
}

/// Pairing of a cluster entry with a user entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContextEntry {
    /// Name of the referenced cluster entry
    #[serde(default)]
    pub cluster: String,
    /// Name of the referenced user entry
    #[serde(default)]
    pub user: String,
    /// Default namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A parsed kubeconfig document
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct KubeConfig {
    /// Document API version
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    /// Cluster entries
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    /// User entries
    #[serde(default)]
    pub users: Vec<NamedUser>,
    /// Context entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<NamedContext>,
    /// Name of the active context
    #[serde(rename = "current-context", default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,
    /// Document kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl KubeConfig {
    /// The context the document points at
    ///
    /// `current-context` wins when it names an existing context; otherwise the
    /// first context is used.
    pub fn active_context(&self) -> Option<&NamedContext> {
        self.current_context
            .as_deref()
            .and_then(|name| self.contexts.iter().find(|c| c.name == name))
            .or_else(|| self.contexts.first())
    }

    /// The cluster and user entries credentials are derived from
    ///
    /// With a context, its references must resolve. Without one, the first
    /// cluster and first user are paired.
    pub fn selected_entries(&self) -> Result<(&NamedCluster, &NamedUser)> {
        let Some(context) = self.active_context() else {
            return match (self.clusters.first(), self.users.first()) {
                (Some(cluster), Some(user)) => Ok((cluster, user)),
                _ => Err(no_clusters_or_users()),
            };
        };

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| {
                Error::validation(
                    "contexts",
                    format!(
                        "context '{}' references unknown cluster '{}'",
                        context.name, context.context.cluster
                    ),
                )
            })?;
        let user = self
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .ok_or_else(|| {
                Error::validation(
                    "contexts",
                    format!(
                        "context '{}' references unknown user '{}'",
                        context.name, context.context.user
                    ),
                )
            })?;
        Ok((cluster, user))
    }
}

fn no_clusters_or_users() -> Error {
    Error::validation("clusters", "config contains no valid clusters or users")
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

/// Parse and validate a cluster-admin kubeconfig
///
/// Fails with [`Error::Parse`] on empty or malformed input and with
/// [`Error::Validation`] when the document lacks clusters/users, the selected
/// user has no auth material, or the selected cluster has no server.
pub fn parse_kube_config(raw: &str) -> Result<KubeConfig> {
    if raw.trim().is_empty() {
        return Err(Error::parse("cannot parse empty kubeconfig"));
    }

    let config: KubeConfig = serde_yaml::from_str(raw)
        .map_err(|e| Error::parse(format!("failed to parse kubeconfig: {e}")))?;

    if config.clusters.is_empty() || config.users.is_empty() {
        return Err(no_clusters_or_users());
    }

    let (cluster, user) = config.selected_entries()?;
    if !user.user.has_auth_material() {
        return Err(Error::validation(
            format!("users.{}", user.name),
            "missing auth material: either a token or a client certificate and key is required",
        ));
    }
    if cluster.cluster.server.trim().is_empty() {
        return Err(Error::validation(
            format!("clusters.{}", cluster.name),
            "invalid or missing server",
        ));
    }

    Ok(config)
}

/// Connection parameters for a deployed cluster
///
/// Base64 fields hold the base64 encoding of the corresponding kubeconfig
/// data. `Debug` hides the client key and password.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterCredentials {
    /// API server URL
    pub host: String,
    /// Admin identity (kubeconfig user name)
    pub username: String,
    /// Bearer token, if the user authenticates with one
    pub password: Option<String>,
    /// Base64-encoded client certificate
    pub client_certificate: Option<String>,
    /// Base64-encoded client key
    pub client_key: Option<String>,
    /// Base64-encoded CA certificate
    pub cluster_ca_certificate: String,
}

impl fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_certificate", &self.client_certificate)
            .field("client_key", &self.client_key.as_ref().map(|_| "<redacted>"))
            .field("cluster_ca_certificate", &self.cluster_ca_certificate)
            .finish()
    }
}

impl ClusterCredentials {
    /// Compare against the endpoint derived from DNS prefix and region
    pub fn matches(&self, expected: &ExpectedEndpoint) -> bool {
        self.host == expected.host && self.username == expected.username
    }

    /// Flattened attribute block for the declarative host
    ///
    /// Absent auth material is omitted rather than emitted as empty strings.
    pub fn to_attributes(&self) -> Value {
        let mut block = json!({
            "host": self.host,
            "username": self.username,
            "cluster_ca_certificate": self.cluster_ca_certificate,
        });
        if let Some(map) = block.as_object_mut() {
            if let Some(password) = &self.password {
                map.insert("password".to_string(), json!(password));
            }
            if let Some(cert) = &self.client_certificate {
                map.insert("client_certificate".to_string(), json!(cert));
            }
            if let Some(key) = &self.client_key {
                map.insert("client_key".to_string(), json!(key));
            }
        }
        block
    }
}

/// Endpoint values derivable from the deployment's own identity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedEndpoint {
    /// `https://<dns_prefix>.<region>.cloudapp.azure.com`
    pub host: String,
    /// `<dns_prefix>-admin`
    pub username: String,
}

impl ExpectedEndpoint {
    /// Derive the endpoint for a deployment
    pub fn new(dns_prefix: &str, region: &str) -> Self {
        Self {
            host: naming::api_server_url(dns_prefix, region),
            username: naming::admin_username(dns_prefix),
        }
    }
}

fn encode_optional(data: &str) -> Option<String> {
    (!data.is_empty()).then(|| STANDARD.encode(data))
}

/// Derive credentials from a parsed kubeconfig
///
/// When `expected` is given, a mismatch with the document is logged; the
/// document stays authoritative.
pub fn extract_credentials(
    config: &KubeConfig,
    expected: Option<&ExpectedEndpoint>,
) -> Result<ClusterCredentials> {
    let (cluster, user) = config.selected_entries()?;

    let credentials = ClusterCredentials {
        host: cluster.cluster.server.clone(),
        username: user.name.clone(),
        password: (!user.user.token.is_empty()).then(|| user.user.token.clone()),
        client_certificate: encode_optional(&user.user.client_certificate_data),
        client_key: encode_optional(&user.user.client_key_data),
        cluster_ca_certificate: STANDARD.encode(&cluster.cluster.certificate_authority_data),
    };

    if let Some(expected) = expected {
        if credentials.matches(expected) {
            debug!(host = %credentials.host, "Kubeconfig matches derived endpoint");
        } else {
            warn!(
                host = %credentials.host,
                expected_host = %expected.host,
                username = %credentials.username,
                expected_username = %expected.username,
                "Kubeconfig endpoint differs from derived endpoint, using kubeconfig values"
            );
        }
    }

    Ok(credentials)
}

/// Parse a raw kubeconfig and flatten it for the declarative host
///
/// Returns the raw document (stored as-is) and a single-element credential
/// block list.
pub fn flatten_kube_config(
    raw: &str,
    expected: Option<&ExpectedEndpoint>,
) -> Result<(String, Vec<Value>)> {
    let config = parse_kube_config(raw)?;
    let credentials = extract_credentials(&config, expected)?;
    Ok((raw.to_string(), vec![credentials.to_attributes()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kubeconfig in the shape the deployment returns (JSON, which is valid YAML)
    fn deployed_kubeconfig(dns_prefix: &str, location: &str) -> String {
        format!(
            r#"{{
    "apiVersion": "v1",
    "clusters": [
        {{
            "cluster": {{
                "certificate-authority-data": "0123",
                "server": "https://{dns_prefix}.{location}.cloudapp.azure.com"
            }},
            "name": "{dns_prefix}"
        }}
    ],
    "contexts": [
        {{
            "context": {{
                "cluster": "{dns_prefix}",
                "user": "{dns_prefix}-admin"
            }},
            "name": "{dns_prefix}"
        }}
    ],
    "current-context": "{dns_prefix}",
    "kind": "Config",
    "users": [
        {{
            "name": "{dns_prefix}-admin",
            "user": {{"client-certificate-data":"4567","client-key-data":"8910"}}
        }}
    ]
}}"#
        )
    }

    // =========================================================================
    // Story: Credentials from a Deployed Cluster
    // =========================================================================

    #[test]
    fn story_credentials_extracted_from_deployed_kubeconfig() {
        let raw = deployed_kubeconfig("masterfqdn", "southcentralus");
        let config = parse_kube_config(&raw).unwrap();
        let expected = ExpectedEndpoint::new("masterfqdn", "southcentralus");

        let creds = extract_credentials(&config, Some(&expected)).unwrap();

        assert_eq!(creds.host, "https://masterfqdn.southcentralus.cloudapp.azure.com");
        assert_eq!(creds.username, "masterfqdn-admin");
        assert_eq!(creds.cluster_ca_certificate, STANDARD.encode("0123"));
        assert_eq!(creds.client_certificate.as_deref(), Some("NDU2Nw=="));
        assert_eq!(creds.client_key, Some(STANDARD.encode("8910")));
        assert_eq!(creds.password, None);
        assert!(creds.matches(&expected));
    }

    #[test]
    fn story_flatten_yields_one_block_and_raw_document() {
        let raw = deployed_kubeconfig("masterfqdn", "southcentralus");
        let (stored, blocks) = flatten_kube_config(&raw, None).unwrap();

        assert_eq!(stored, raw);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["cluster_ca_certificate"], STANDARD.encode("0123"));
        assert_eq!(blocks[0]["username"], "masterfqdn-admin");
        assert!(blocks[0].get("password").is_none());
    }

    /// A document for another endpoint is still authoritative
    #[test]
    fn story_mismatched_endpoint_is_not_an_error() {
        let raw = deployed_kubeconfig("other", "eastus");
        let config = parse_kube_config(&raw).unwrap();
        let expected = ExpectedEndpoint::new("masterfqdn", "southcentralus");

        let creds = extract_credentials(&config, Some(&expected)).unwrap();
        assert!(!creds.matches(&expected));
        assert_eq!(creds.host, "https://other.eastus.cloudapp.azure.com");
    }

    #[test]
    fn story_token_auth_surfaces_as_password() {
        let raw = r#"
apiVersion: v1
clusters:
- name: c
  cluster:
    server: https://c.example
    certificate-authority-data: ca
users:
- name: admin
  user:
    token: s3cret
"#;
        let config = parse_kube_config(raw).unwrap();
        let creds = extract_credentials(&config, None).unwrap();
        assert_eq!(creds.password.as_deref(), Some("s3cret"));
        assert_eq!(creds.client_certificate, None);
        assert!(!format!("{creds:?}").contains("s3cret"));
        assert_eq!(creds.to_attributes()["password"], "s3cret");
    }

    // =========================================================================
    // Story: Malformed Documents
    // =========================================================================

    #[test]
    fn empty_document_is_parse_error() {
        assert!(matches!(parse_kube_config(""), Err(Error::Parse(_))));
        assert!(matches!(parse_kube_config("  \n"), Err(Error::Parse(_))));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        assert!(matches!(parse_kube_config("clusters: [unclosed"), Err(Error::Parse(_))));
        assert!(matches!(parse_kube_config("clusters: 42"), Err(Error::Parse(_))));
    }

    #[test]
    fn document_without_users_is_validation_error() {
        let raw = "apiVersion: v1\nclusters:\n- name: c\n  cluster:\n    server: https://c\n";
        let err = parse_kube_config(raw).unwrap_err();
        assert!(err.to_string().contains("no valid clusters or users"));
    }

    #[test]
    fn user_without_auth_material_is_validation_error() {
        let raw = r#"
apiVersion: v1
clusters:
- name: c
  cluster:
    server: https://c.example
    certificate-authority-data: ca
users:
- name: admin
  user:
    client-certificate-data: cert-only
"#;
        let err = parse_kube_config(raw).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("missing auth material"));
    }

    #[test]
    fn cluster_without_server_is_validation_error() {
        let raw = r#"
clusters:
- name: c
  cluster:
    certificate-authority-data: ca
users:
- name: admin
  user:
    token: t
"#;
        let err = parse_kube_config(raw).unwrap_err();
        assert!(err.to_string().contains("invalid or missing server"));
    }

    #[test]
    fn context_with_unknown_user_is_validation_error() {
        let raw = r#"
clusters:
- name: c
  cluster:
    server: https://c.example
users:
- name: admin
  user:
    token: t
contexts:
- name: ctx
  context:
    cluster: c
    user: nobody
"#;
        let err = parse_kube_config(raw).unwrap_err();
        assert_eq!(err.field(), Some("contexts"));
        assert!(err.to_string().contains("unknown user 'nobody'"));
    }

    /// current-context selects among several entries
    #[test]
    fn current_context_selects_entries() {
        let raw = r#"
clusters:
- name: a
  cluster:
    server: https://a.example
- name: b
  cluster:
    server: https://b.example
users:
- name: a-admin
  user:
    token: ta
- name: b-admin
  user:
    token: tb
contexts:
- name: a
  context: {cluster: a, user: a-admin}
- name: b
  context: {cluster: b, user: b-admin}
current-context: b
"#;
        let config = parse_kube_config(raw).unwrap();
        let creds = extract_credentials(&config, None).unwrap();
        assert_eq!(creds.host, "https://b.example");
        assert_eq!(creds.username, "b-admin");
    }
}
