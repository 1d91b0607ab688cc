//! ACS Engine - declarative Kubernetes cluster provisioning on Azure
//!
//! Sits between a declarative configuration host and the ACS Engine template
//! generator. The host hands over a flat attribute set; this crate turns it
//! into a validated cluster spec, renders a deployment template, gates
//! version upgrades and derives connection credentials from the deployed
//! cluster's kubeconfig.
//!
//! # Data flow
//!
//! ```text
//! attributes -> mapper::expand_cluster_spec -> ClusterSpec -> template::generate_template
//!           <- mapper::flatten_cluster_spec <- ClusterSpec <- kubeconfig::extract_credentials
//! ```
//!
//! Every operation is a pure function of its arguments: no global state, no
//! I/O apart from explicit file loading in [`config`].
//!
//! # Modules
//!
//! - [`cluster`] - Typed cluster spec (identity, profiles, agent pools)
//! - [`mapper`] - Expand/flatten between host attributes and the cluster spec
//! - [`version`] - Kubernetes version parsing, supported table and upgrade policy
//! - [`kubeconfig`] - Kubeconfig parsing and credential extraction
//! - [`naming`] - Storage account names and derived DNS names
//! - [`template`] - Template generation and in-place update planning
//! - [`config`] - Provider configuration
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod kubeconfig;
pub mod mapper;
pub mod naming;
pub mod template;
pub mod version;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
