//! Input and output artifacts of a publish

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{PublishError, Result};

/// Producer ids whose output can be published
pub const ACCEPTED_PRODUCERS: &[&str] = &["mitchellh.post-processor.vagrant", "vagrant"];

/// Producer id carried by [`PublishedManifest`]
pub const PUBLISHER_ID: &str = "boxshelf.post-processor.vagrant-s3";

const BOX_EXTENSION: &str = ".box";

/// A packaged box handed over by the build step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxArtifact {
    /// Id of whatever produced the files
    pub producer_id: String,
    /// Name of the builder the box was made with (`virtualbox`, `vmware`, ...)
    pub builder: String,
    pub files: Vec<PathBuf>,
}

impl BoxArtifact {
    pub fn new(
        producer_id: impl Into<String>,
        builder: impl Into<String>,
        files: Vec<PathBuf>,
    ) -> Self {
        Self {
            producer_id: producer_id.into(),
            builder: builder.into(),
            files,
        }
    }

    /// The single box file to publish.
    ///
    /// Rejects artifacts from other producers, file lists whose first entry
    /// is not a `.box`, and box paths that are not valid UTF-8.
    pub fn box_file(&self) -> Result<&Path> {
        if !ACCEPTED_PRODUCERS.contains(&self.producer_id.as_str()) {
            return Err(PublishError::invalid_artifact(format!(
                "requires box from vagrant post-processor, got producer '{}'",
                self.producer_id
            )));
        }

        let file = match self.files.first() {
            Some(file) if file.to_string_lossy().ends_with(BOX_EXTENSION) => file,
            _ => {
                return Err(PublishError::invalid_artifact(format!(
                    "unknown files in artifact from vagrant post-processor: {:?}",
                    self.files
                )))
            },
        };

        // The file name becomes part of the object key verbatim
        if file.to_str().is_none() {
            return Err(PublishError::invalid_artifact(format!(
                "box path is not valid UTF-8: {}",
                file.display()
            )));
        }

        Ok(file)
    }

    /// Vagrant provider name for the builder
    pub fn provider(&self) -> String {
        provider_from_builder(&self.builder)
    }
}

/// Map a builder name to the Vagrant provider it targets
pub fn provider_from_builder(builder: &str) -> String {
    match builder {
        "vmware" => "vmware_desktop".to_string(),
        other => other.to_string(),
    }
}

/// Result of a publish: where the manifest can be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedManifest {
    pub url: String,
}

impl PublishedManifest {
    pub fn producer_id(&self) -> &'static str {
        PUBLISHER_ID
    }
}

impl fmt::Display for PublishedManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vagrant manifest url: {}", self.url)
    }
}
