//! Command implementations

pub mod next_version;
pub mod publish;

use std::sync::Arc;

use anyhow::Result;
use boxshelf_publisher::{
    config::{ConfigErrors, PublishSettings},
    storage::{config::StoreConfig, S3Store},
    Publisher,
};
use tracing::debug;

use crate::TargetArgs;

impl TargetArgs {
    fn settings(&self) -> PublishSettings {
        PublishSettings {
            region: self
                .region
                .clone()
                .or_else(|| std::env::var("AWS_REGION").ok()),
            bucket: self.bucket.clone(),
            manifest: self.manifest.clone(),
            box_name: self.box_name.clone(),
            box_dir: self.box_dir.clone(),
            version: self.version.clone(),
            acl: self.acl.clone(),
            storage_class: self.storage_class.clone(),
            cloudfront: self.cloudfront.clone(),
            signed_expiry: self.signed_expiry,
            part_size: self.part_size,
            concurrency: self.concurrency,
            endpoint: self.endpoint.clone(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validate the target and connect to its bucket.
///
/// Without a region and bucket there is nothing to connect to, so only the
/// static problems are reported; otherwise bucket access is checked too and
/// reported together with every other problem.
pub(crate) async fn connect(target: &TargetArgs) -> Result<Publisher> {
    let settings = target.settings();

    let (Some(region), Some(bucket)) = (non_empty(&settings.region), non_empty(&settings.bucket))
    else {
        // A missing region or bucket is always among these problems
        return Err(ConfigErrors(settings.problems()).into());
    };

    let store_config = StoreConfig {
        endpoint: settings.endpoint.clone(),
        region,
        bucket,
        credentials: target.credentials(),
    };
    debug!(bucket = %store_config.bucket, "Connecting to bucket");

    let store = S3Store::connect(&store_config).await;
    Ok(Publisher::connect(settings, Arc::new(store)).await?)
}
