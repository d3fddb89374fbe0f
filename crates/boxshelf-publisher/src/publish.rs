//! Publish orchestrator
//!
//! One call to [`Publisher::publish`] moves one box into the store and records
//! it in the manifest:
//!
//! 1. validate the input artifact
//! 2. resolve the version (explicit, or next minor of the manifest's latest)
//! 3. checksum the box
//! 4. upload it to `{box_dir}/{version}/{basename}`
//! 5. fetch the manifest, or start an empty one
//! 6. add the version/provider entry
//! 7. overwrite the manifest
//! 8. return the manifest URL
//!
//! The first failing step ends the publish. Nothing already done is undone; a
//! box uploaded before a failed manifest write stays in the bucket.
//!
//! The manifest read-modify-write is not conditional. Two publishes racing on
//! the same manifest key can lose one update, so callers must serialize
//! publishes per manifest.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use boxshelf_common::checksum;

use crate::artifact::{BoxArtifact, PublishedManifest};
use crate::config::{PublishConfig, PublishSettings};
use crate::error::{PublishError, Result};
use crate::manifest::{Manifest, ManifestError, Provider};
use crate::status::StatusSink;
use crate::storage::{ObjectBody, ObjectStore};
use crate::upload::UploadPipeline;
use crate::url::UrlResolver;

/// Publishes boxes for one configuration against one store
pub struct Publisher {
    config: PublishConfig,
    store: Arc<dyn ObjectStore>,
    pipeline: UploadPipeline,
    urls: UrlResolver,
}

impl Publisher {
    pub fn new(config: PublishConfig, store: Arc<dyn ObjectStore>) -> Self {
        let pipeline = UploadPipeline::new(store.clone(), config.upload);
        let urls = config.url_resolver();
        Self {
            config,
            store,
            pipeline,
            urls,
        }
    }

    /// Validate `settings` against `store` and build a publisher.
    ///
    /// Static problems and a failed bucket access check come back together as
    /// [`PublishError::Config`].
    pub async fn connect(settings: PublishSettings, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let config = PublishConfig::from_settings_checked(settings, store.as_ref()).await?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    #[instrument(
        skip_all,
        fields(bucket = %self.config.bucket, manifest = %self.config.manifest_key)
    )]
    pub async fn publish(
        &self,
        artifact: &BoxArtifact,
        ui: &dyn StatusSink,
    ) -> Result<PublishedManifest> {
        let box_path = artifact.box_file()?;
        let provider = artifact.provider();

        ui.say(&format!(
            "Preparing to upload box for '{}' provider to S3 bucket '{}'",
            provider, self.config.bucket
        ));

        let size = tokio::fs::metadata(box_path)
            .await
            .map_err(|e| PublishError::io(box_path, e))?
            .len();
        ui.message(&format!("Box to upload: {} ({} bytes)", box_path.display(), size));

        let version = match &self.config.version {
            Some(version) => {
                ui.message(&format!("Using {} as new version", version));
                version.clone()
            },
            None => {
                let version = self.fetch_manifest().await?.next_version().to_string();
                ui.message(&format!("No version defined, using {} as new version", version));
                version
            },
        };

        let box_key = self.config.box_key(&version, box_path);

        ui.message("Generating checksum");
        let checksum = checksum::digest_file(box_path)
            .await
            .map_err(PublishError::Checksum)?;
        ui.message(&format!("Checksum is {}", checksum));

        ui.message(&format!(
            "Uploading box to S3: {}, PartSize: {}, Concurrency: {}",
            box_key,
            self.pipeline.options().part_size,
            self.pipeline.options().concurrency
        ));
        let outcome = self
            .pipeline
            .upload_file(box_path, &box_key, &self.config.box_put_options())
            .await?;
        ui.message(&format!("Box upload took: {:?}", outcome.elapsed));
        info!(
            key = %outcome.key,
            size = outcome.size,
            parts = outcome.parts,
            "Box uploaded"
        );

        ui.message("Fetching latest manifest");
        let mut manifest = self.fetch_manifest().await?;

        ui.message(&format!("Adding {} {} box to manifest", provider, version));
        if let Some(existing) = manifest.find_version(&version) {
            ui.message(&format!(
                "Version {} already lists {} provider(s)",
                version,
                existing.providers.len()
            ));
        }
        let url = self.urls.box_url(self.store.as_ref(), &box_key).await?;
        manifest
            .add(&version, Provider::sha256(provider, url, checksum))
            .map_err(|e| self.manifest_error(e))?;

        ui.message(&format!("Uploading the manifest: {}", self.config.manifest_key));
        self.put_manifest(&manifest).await?;

        Ok(PublishedManifest {
            url: self.urls.public_url(&self.config.manifest_key),
        })
    }

    /// Current manifest, or an empty one named after the box if none exists
    pub async fn fetch_manifest(&self) -> Result<Manifest> {
        match self.store.get_object(&self.config.manifest_key).await {
            Ok(body) => Manifest::from_json(&body).map_err(|e| self.manifest_error(e)),
            Err(e) if e.is_not_found() => {
                debug!(
                    key = %self.config.manifest_key,
                    "No manifest yet, starting an empty one"
                );
                Ok(Manifest::empty(&self.config.box_name))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn put_manifest(&self, manifest: &Manifest) -> Result<()> {
        let body = manifest
            .to_json_pretty()
            .map_err(|e| self.manifest_error(e))?;

        self.store
            .put_object(
                &self.config.manifest_key,
                ObjectBody::Bytes(Bytes::from(body)),
                &self.config.manifest_put_options(),
            )
            .await?;
        Ok(())
    }

    fn manifest_error(&self, source: ManifestError) -> PublishError {
        PublishError::Manifest {
            bucket: self.config.bucket.clone(),
            key: self.config.manifest_key.clone(),
            source,
        }
    }
}
