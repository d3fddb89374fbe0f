//! Public URLs for published objects

use std::time::Duration;

use crate::storage::{ObjectStore, StoreError};

/// How box URLs in the manifest are formed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UrlPolicy {
    /// Path-style object store URL
    #[default]
    Plain,
    /// `https://{host}/{key}` behind a CDN such as CloudFront
    Cdn(String),
    /// Presigned GET URL valid for the given duration
    Presigned(Duration),
}

/// Builds URLs for keys in one bucket
#[derive(Debug, Clone)]
pub struct UrlResolver {
    region: String,
    bucket: String,
    endpoint: Option<String>,
    policy: UrlPolicy,
}

impl UrlResolver {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        endpoint: Option<String>,
        policy: UrlPolicy,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            endpoint,
            policy,
        }
    }

    /// Plain or CDN URL. Never presigned, so it is stable across publishes.
    pub fn public_url(&self, key: &str) -> String {
        if let UrlPolicy::Cdn(host) = &self.policy {
            return format!("https://{}/{}", host, key);
        }

        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None if self.region == "us-east-1" => {
                format!("https://s3.amazonaws.com/{}/{}", self.bucket, key)
            },
            None => format!("https://s3-{}.amazonaws.com/{}/{}", self.region, self.bucket, key),
        }
    }

    /// URL recorded in the manifest for an uploaded box
    pub async fn box_url(&self, store: &dyn ObjectStore, key: &str) -> Result<String, StoreError> {
        match self.policy {
            UrlPolicy::Presigned(ttl) => store.presign_get(key, ttl).await,
            UrlPolicy::Plain | UrlPolicy::Cdn(_) => Ok(self.public_url(key)),
        }
    }
}
