//! Publisher error types

use std::path::PathBuf;
use thiserror::Error;

use boxshelf_common::BoxshelfError;

use crate::config::ConfigErrors;
use crate::manifest::ManifestError;
use crate::storage::StoreError;

/// Result type alias for publish operations
pub type Result<T> = std::result::Result<T, PublishError>;

/// Why a single multipart attempt failed
#[derive(Error, Debug)]
pub enum PartFailure {
    #[error("failed to read part from source: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Every way a publish can fail
#[derive(Error, Debug)]
pub enum PublishError {
    /// The input is not a single box file from the vagrant post-processor
    #[error("Unknown artifact: {0}")]
    InvalidArtifact(String),

    #[error(transparent)]
    Config(#[from] ConfigErrors),

    #[error("Failed to checksum box: {0}")]
    Checksum(#[source] BoxshelfError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Part {part_number} of s3://{bucket}/{key} failed after {attempts} attempts: {source}")]
    PartRetriesExhausted {
        bucket: String,
        key: String,
        part_number: i32,
        attempts: u32,
        #[source]
        source: PartFailure,
    },

    #[error("Manifest s3://{bucket}/{key}: {source}")]
    Manifest {
        bucket: String,
        key: String,
        #[source]
        source: ManifestError,
    },

    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn invalid_artifact(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The version/provider pair is already in the manifest
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Manifest {
                source: ManifestError::DuplicateProvider { .. },
                ..
            }
        )
    }
}
