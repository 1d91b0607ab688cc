//! Kubernetes version parsing and upgrade policy
//!
//! Versions are strict `<major>.<minor>.<patch>` triples of non-negative
//! integers. Two independent checks live here:
//!
//! - [`check_upgrade`] decides whether a running cluster may move from one
//!   version to another (forward only, same major, at most one minor step).
//! - [`SupportedVersions::check`] decides whether a version may be used to
//!   create a cluster at all, against a table of supported release lines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PolicyViolation;
use crate::{Error, Result};

/// A parsed `<major>.<minor>.<patch>` Kubernetes version
///
/// Ordering is lexicographic on (major, minor, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubernetesVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl KubernetesVersion {
    /// Create a version from its components
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The release line (major.minor) this version belongs to
    pub fn release_line(&self) -> ReleaseLine {
        ReleaseLine {
            major: self.major,
            minor: self.minor,
        }
    }

    /// Check whether a running cluster at `self` may move to `proposed`
    pub fn upgrade_to(&self, proposed: &Self) -> std::result::Result<(), PolicyViolation> {
        let current = *self;
        let proposed = *proposed;

        if proposed == current {
            return Err(PolicyViolation::NoOp { current });
        }
        if proposed < current {
            return Err(PolicyViolation::Downgrade { current, proposed });
        }
        if proposed.major != current.major {
            return Err(PolicyViolation::MajorJump { current, proposed });
        }
        // proposed > current with equal majors, so minor cannot go backwards here
        if proposed.minor - current.minor > 1 {
            return Err(PolicyViolation::MultiMinorJump { current, proposed });
        }
        Ok(())
    }
}

fn parse_component(raw: &str, component: &str, input: &str) -> Result<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::parse(format!(
            "invalid kubernetes version '{input}': {component} component '{raw}' is not a non-negative integer"
        )));
    }
    raw.parse::<u32>().map_err(|e| {
        Error::parse(format!(
            "invalid kubernetes version '{input}': {component} component out of range: {e}"
        ))
    })
}

impl FromStr for KubernetesVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::parse(format!(
                "invalid kubernetes version '{s}': expected format '<major>.<minor>.<patch>'"
            )));
        }
        Ok(Self {
            major: parse_component(parts[0], "major", s)?,
            minor: parse_component(parts[1], "minor", s)?,
            patch: parse_component(parts[2], "patch", s)?,
        })
    }
}

impl fmt::Display for KubernetesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for KubernetesVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KubernetesVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A Kubernetes release line, e.g. `1.8`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseLine {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
}

impl ReleaseLine {
    /// Create a release line from its components
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for ReleaseLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 {
            return Err(Error::parse(format!(
                "invalid release line '{s}': expected format '<major>.<minor>'"
            )));
        }
        Ok(Self {
            major: parse_component(parts[0], "major", s)?,
            minor: parse_component(parts[1], "minor", s)?,
        })
    }
}

impl fmt::Display for ReleaseLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for ReleaseLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReleaseLine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Table of release lines a new cluster may be created with
///
/// The table is data: it is loaded with the provider configuration and can be
/// refreshed without touching the policy logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ReleaseLine>", into = "Vec<ReleaseLine>")]
pub struct SupportedVersions {
    lines: Vec<ReleaseLine>,
}

impl SupportedVersions {
    /// Build a table from the given release lines
    pub fn new(lines: impl IntoIterator<Item = ReleaseLine>) -> Self {
        let mut lines: Vec<ReleaseLine> = lines.into_iter().collect();
        lines.sort();
        lines.dedup();
        Self { lines }
    }

    /// Release lines in the table, oldest first
    pub fn lines(&self) -> &[ReleaseLine] {
        &self.lines
    }

    /// Returns true if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns true if the version's release line is in the table
    pub fn contains(&self, version: &KubernetesVersion) -> bool {
        self.lines.contains(&version.release_line())
    }

    /// Parse and check a version string against the table
    ///
    /// Malformed strings fail with [`Error::Parse`]; well-formed versions
    /// outside the table fail with [`Error::UnsupportedVersion`].
    pub fn check(&self, version: &str) -> Result<KubernetesVersion> {
        let parsed: KubernetesVersion = version.parse()?;
        if !self.contains(&parsed) {
            return Err(Error::unsupported_version(format!(
                "{version} (supported release lines: {})",
                self.describe()
            )));
        }
        Ok(parsed)
    }

    fn describe(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<Vec<ReleaseLine>> for SupportedVersions {
    fn from(lines: Vec<ReleaseLine>) -> Self {
        Self::new(lines)
    }
}

impl From<SupportedVersions> for Vec<ReleaseLine> {
    fn from(table: SupportedVersions) -> Self {
        table.lines
    }
}

impl Default for SupportedVersions {
    fn default() -> Self {
        Self::new((6..=10).map(|minor| ReleaseLine::new(1, minor)))
    }
}

/// Check whether a running cluster may move from `current` to `proposed`
///
/// Both strings must parse; a rejected transition is returned as
/// [`Error::Policy`] carrying the broken rule.
pub fn check_upgrade(current: &str, proposed: &str) -> Result<()> {
    let current: KubernetesVersion = current.parse()?;
    let proposed: KubernetesVersion = proposed.parse()?;
    current.upgrade_to(&proposed)?;
    Ok(())
}

/// Boolean form of [`check_upgrade`]
///
/// Parse failures are still errors; only policy rejections map to `false`.
pub fn is_upgrade_allowed(current: &str, proposed: &str) -> Result<bool> {
    match check_upgrade(current, proposed) {
        Ok(()) => Ok(true),
        Err(Error::Policy(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Check a standalone version against the supported table
///
/// Returns `Ok(true)` for supported versions, [`Error::Parse`] for malformed
/// strings and [`Error::UnsupportedVersion`] for well-formed versions outside
/// the table.
pub fn is_supported_version(supported: &SupportedVersions, version: &str) -> Result<bool> {
    supported.check(version).map(|_| true)
}
