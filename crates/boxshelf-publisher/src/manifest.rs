//! Vagrant box manifest model
//!
//! The manifest is the JSON index of every published version and provider
//! variant of one named box. It is read whole, mutated once in memory, and
//! written back whole.

use semver::Version as SemVer;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use boxshelf_common::checksum::CHECKSUM_TYPE;

/// Manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("{provider} box already exists in manifest for version {version}")]
    DuplicateProvider { provider: String, version: String },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Index of all published versions of one box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub versions: Vec<Version>,

    /// Fields this model does not know about, kept for the write back
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One release line of a box across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub providers: Vec<Provider>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A box built for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub url: String,
    pub checksum_type: String,
    pub checksum: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Provider {
    /// Provider entry with a SHA-256 checksum
    pub fn sha256(
        name: impl Into<String>,
        url: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            checksum_type: CHECKSUM_TYPE.to_string(),
            checksum: checksum.into(),
            extra: Map::new(),
        }
    }
}

impl Manifest {
    /// Manifest for a box that has never been published
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed document with a trailing newline
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, ManifestError> {
        let mut body = serde_json::to_vec_pretty(self)?;
        body.push(b'\n');
        Ok(body)
    }

    pub fn find_version(&self, version: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Add a provider under `version`.
    ///
    /// Appends to the existing entry for `version`, or appends a new entry when
    /// there is none. Fails without touching the manifest when that version
    /// already has a provider with the same name.
    pub fn add(&mut self, version: &str, provider: Provider) -> Result<(), ManifestError> {
        match self.versions.iter_mut().find(|v| v.version == version) {
            Some(existing) => {
                if existing.providers.iter().any(|p| p.name == provider.name) {
                    return Err(ManifestError::DuplicateProvider {
                        provider: provider.name,
                        version: version.to_string(),
                    });
                }
                existing.providers.push(provider);
            },
            None => self.versions.push(Version {
                version: version.to_string(),
                providers: vec![provider],
                extra: Map::new(),
            }),
        }
        Ok(())
    }

    /// Highest published version, or `0.0.0` when nothing parses.
    ///
    /// Only major.minor.patch take part in the ordering; pre-release and build
    /// metadata are dropped.
    pub fn latest_version(&self) -> SemVer {
        self.versions
            .iter()
            .filter_map(|v| SemVer::parse(&v.version).ok())
            .map(|v| SemVer::new(v.major, v.minor, v.patch))
            .max()
            .unwrap_or_else(|| SemVer::new(0, 0, 0))
    }

    /// Version chosen when the caller does not name one: next minor of the latest
    pub fn next_version(&self) -> SemVer {
        let latest = self.latest_version();
        SemVer::new(latest.major, latest.minor + 1, 0)
    }
}
