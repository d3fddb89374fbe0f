//! Object store capability
//!
//! The publisher talks to storage only through [`ObjectStore`]. [`S3Store`]
//! is the production backend; anything else (tests, other clouds) implements
//! the same trait.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod s3;

pub use s3::S3Store;

/// Content type of the manifest document
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Object store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("{op} failed for s3://{bucket}/{key}: {message}")]
    Request {
        op: &'static str,
        bucket: String,
        key: String,
        message: String,
    },
}

impl StoreError {
    pub fn request(
        op: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Request {
            op,
            bucket: bucket.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Body of a single-shot put
#[derive(Debug, Clone)]
pub enum ObjectBody {
    Bytes(Bytes),
    /// Streamed from disk by the backend
    File(PathBuf),
}

/// Object attributes applied on write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub acl: Option<String>,
    pub content_type: Option<String>,
    pub storage_class: Option<String>,
}

/// A part the store acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: Option<String>,
    pub size: u64,
}

/// Storage operations the publisher needs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket all keys are relative to
    fn bucket(&self) -> &str;

    /// Check that the bucket exists and is reachable with our credentials
    async fn head_bucket(&self) -> Result<(), StoreError>;

    /// Fetch a whole object; a missing key is [`StoreError::NotFound`]
    async fn get_object(&self, key: &str) -> Result<Bytes, StoreError>;

    async fn put_object(
        &self,
        key: &str,
        body: ObjectBody,
        options: &PutOptions,
    ) -> Result<(), StoreError>;

    /// Start a multipart upload and return its upload id
    async fn create_multipart_upload(
        &self,
        key: &str,
        options: &PutOptions,
    ) -> Result<String, StoreError>;

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<UploadedPart, StoreError>;

    /// Join the parts; `parts` is ordered by part number
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StoreError>;

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), StoreError>;

    /// Time-limited GET URL for `key`
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError>;
}
