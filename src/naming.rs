//! Derived names for cluster resources
//!
//! Storage account names, normalized locations and the externally visible
//! DNS names of a deployed cluster are all pure functions of user input.

/// Suffix appended to every generated storage account name
pub const STORAGE_ACCOUNT_SUFFIX: &str = "acc";

/// Maximum length of the sanitized prefix before [`STORAGE_ACCOUNT_SUFFIX`]
pub const STORAGE_ACCOUNT_PREFIX_MAX_LEN: usize = 20;

/// DNS zone under which cluster endpoints are published
pub const CLOUDAPP_DOMAIN: &str = "cloudapp.azure.com";

/// Build a storage account name from an arbitrary display name
///
/// Keeps ASCII letters and digits only (everything else is dropped, not
/// replaced), lowercases, truncates to [`STORAGE_ACCOUNT_PREFIX_MAX_LEN`]
/// and appends [`STORAGE_ACCOUNT_SUFFIX`].
pub fn storage_account_name(name: &str) -> String {
    let mut account: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(STORAGE_ACCOUNT_PREFIX_MAX_LEN)
        .collect();
    account.push_str(STORAGE_ACCOUNT_SUFFIX);
    account
}

/// Normalize a region name: lowercase with all whitespace removed
///
/// `"South Central US"` and `"southcentralus"` name the same region.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Fully-qualified domain name of the master endpoint
pub fn master_fqdn(dns_prefix: &str, location: &str) -> String {
    format!(
        "{}.{}.{}",
        dns_prefix,
        normalize_location(location),
        CLOUDAPP_DOMAIN
    )
}

/// Externally reachable API server URL for a cluster
pub fn api_server_url(dns_prefix: &str, location: &str) -> String {
    format!("https://{}", master_fqdn(dns_prefix, location))
}

/// Name of the cluster-admin user in the generated kubeconfig
pub fn admin_username(dns_prefix: &str) -> String {
    format!("{dns_prefix}-admin")
}
