//! ACS Engine CLI - render templates and check cluster settings offline

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use acsengine::cluster::ClusterSpec;
use acsengine::config::ProviderConfig;
use acsengine::kubeconfig::{flatten_kube_config, ExpectedEndpoint};
use acsengine::mapper::{mask_sensitive, ResourceData};
use acsengine::naming;
use acsengine::template::{generate_template, ArmTemplateGenerator};
use acsengine::version::{check_upgrade, is_supported_version};

/// ACS Engine - declarative Kubernetes cluster provisioning on Azure
#[derive(Parser, Debug)]
#[command(name = "acsengine", version, about, long_about = None)]
struct Cli {
    /// Provider configuration file (supported versions, default version)
    #[arg(long, global = true, env = "ACSENGINE_PROVIDER_CONFIG")]
    provider_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expand a cluster attribute file and render its deployment template
    Template {
        /// Path to the cluster attributes (YAML or JSON)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },

    /// Check a version against the supported table
    CheckVersion {
        /// Version to check (`<major>.<minor>.<patch>`)
        version: String,
    },

    /// Check whether a running cluster may upgrade between two versions
    CheckUpgrade {
        /// Version the cluster runs now
        #[arg(long)]
        current: String,

        /// Requested version
        #[arg(long)]
        proposed: String,
    },

    /// Print the credentials derived from a cluster's kubeconfig
    ///
    /// Secrets are masked.
    Credentials {
        /// Path to the kubeconfig returned by the deployment
        #[arg(long)]
        kubeconfig: PathBuf,

        /// DNS prefix of the master profile, to cross-check the endpoint
        #[arg(long, requires = "location")]
        dns_prefix: Option<String>,

        /// Region of the deployment, to cross-check the endpoint
        #[arg(long, requires = "dns_prefix")]
        location: Option<String>,
    },

    /// Print the storage account name derived from a cluster name
    StorageName {
        /// Cluster display name
        name: String,
    },

    /// Print the JSON schema of the cluster spec
    Schema,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.provider_config.as_deref())?;

    match cli.command {
        Commands::Template { file } => run_template(&file, &config),
        Commands::CheckVersion { version } => {
            is_supported_version(&config.supported_versions, &version)?;
            println!("{version} is supported");
            Ok(())
        }
        Commands::CheckUpgrade { current, proposed } => {
            check_upgrade(&current, &proposed)?;
            println!("upgrade from {current} to {proposed} is allowed");
            Ok(())
        }
        Commands::Credentials {
            kubeconfig,
            dns_prefix,
            location,
        } => run_credentials(&kubeconfig, dns_prefix.zip(location)),
        Commands::StorageName { name } => {
            println!("{}", naming::storage_account_name(&name));
            Ok(())
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(ClusterSpec);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    match path {
        Some(path) => ProviderConfig::from_file(path)
            .with_context(|| format!("failed to load provider config {}", path.display())),
        None => {
            debug!("No provider config given, using defaults");
            Ok(ProviderConfig::default())
        }
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Render the template and parameters for an attribute file
///
/// The parameters file carries the service principal secret, so it is
/// printed masked.
fn run_template(file: &Path, config: &ProviderConfig) -> anyhow::Result<()> {
    let data = ResourceData::from_yaml(&read(file)?)?;
    let rendered = generate_template(&data, config, &ArmTemplateGenerator::new())?;
    let parameters: serde_json::Value = serde_json::from_str(&rendered.parameters)?;

    println!("{}", rendered.template);
    println!("{}", serde_json::to_string_pretty(&mask_parameters(parameters))?);
    Ok(())
}

const CLIENT_SECRET_VALUE: &str = "/parameters/servicePrincipalClientSecret/value";

/// Mask `securestring` parameter values
fn mask_parameters(mut parameters: serde_json::Value) -> serde_json::Value {
    if let Some(secret) = parameters.pointer_mut(CLIENT_SECRET_VALUE) {
        *secret = serde_json::Value::String("<sensitive>".to_string());
    }
    parameters
}

fn run_credentials(kubeconfig: &Path, endpoint: Option<(String, String)>) -> anyhow::Result<()> {
    let expected =
        endpoint.map(|(dns_prefix, location)| ExpectedEndpoint::new(&dns_prefix, &location));
    let (_, credentials) = flatten_kube_config(&read(kubeconfig)?, expected.as_ref())?;
    let shown = mask_sensitive(&serde_json::Value::Array(credentials));
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
