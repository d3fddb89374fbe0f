use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl, StorageClass},
    Client,
};
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::config::{CredentialSource, StoreConfig};
use super::{ObjectBody, ObjectStore, PutOptions, StoreError, UploadedPart};

/// [`ObjectStore`] backed by Amazon S3 or an S3-compatible server
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client for `config` and wrap it
    pub async fn connect(config: &StoreConfig) -> Self {
        debug!(
            region = %config.region,
            bucket = %config.bucket,
            endpoint = ?config.endpoint,
            "Initializing S3 client"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        match &config.credentials {
            CredentialSource::Static {
                access_key,
                secret_key,
                session_token,
            } => {
                loader = loader.credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    session_token.clone(),
                    None,
                    "boxshelf-static",
                ));
            },
            CredentialSource::Profile(profile) => {
                loader = loader.profile_name(profile);
            },
            CredentialSource::DefaultChain => {},
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, "S3 client initialized");

        Self::new(client, config.bucket.clone())
    }

    fn request_error<E>(&self, op: &'static str, key: &str, err: E) -> StoreError
    where
        E: std::error::Error,
    {
        StoreError::request(op, &self.bucket, key, DisplayErrorContext(err))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn head_bucket(&self) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| self.request_error("HeadBucket", "", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get_object(&self, key: &str) -> Result<Bytes, StoreError> {
        debug!("Downloading s3://{}/{}", self.bucket, key);

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let missing = e.as_service_error().is_some_and(|se| se.is_no_such_key())
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if missing {
                    return Err(StoreError::NotFound {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                    });
                }
                return Err(self.request_error("GetObject", key, e));
            },
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| self.request_error("GetObject", key, e))?
            .into_bytes();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, key);

        Ok(data)
    }

    #[instrument(skip(self, body, options), fields(bucket = %self.bucket))]
    async fn put_object(
        &self,
        key: &str,
        body: ObjectBody,
        options: &PutOptions,
    ) -> Result<(), StoreError> {
        let stream = match body {
            ObjectBody::Bytes(bytes) => ByteStream::from(bytes),
            ObjectBody::File(path) => ByteStream::from_path(&path)
                .await
                .map_err(|e| self.request_error("PutObject", key, e))?,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(stream)
            .set_acl(options.acl.as_deref().map(ObjectCannedAcl::from))
            .set_storage_class(options.storage_class.as_deref().map(StorageClass::from))
            .set_content_type(options.content_type.clone())
            .send()
            .await
            .map_err(|e| self.request_error("PutObject", key, e))?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(())
    }

    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    async fn create_multipart_upload(
        &self,
        key: &str,
        options: &PutOptions,
    ) -> Result<String, StoreError> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .set_acl(options.acl.as_deref().map(ObjectCannedAcl::from))
            .set_storage_class(options.storage_class.as_deref().map(StorageClass::from))
            .set_content_type(options.content_type.clone())
            .send()
            .await
            .map_err(|e| self.request_error("CreateMultipartUpload", key, e))?;

        response.upload_id().map(str::to_string).ok_or_else(|| {
            StoreError::request(
                "CreateMultipartUpload",
                &self.bucket,
                key,
                "response carried no upload id",
            )
        })
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket, size = body.len()))]
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<UploadedPart, StoreError> {
        let size = body.len() as u64;

        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| self.request_error("UploadPart", key, e))?;

        Ok(UploadedPart {
            part_number,
            e_tag: response.e_tag().map(str::to_string),
            size,
        })
    }

    #[instrument(skip(self, parts), fields(bucket = %self.bucket, parts = parts.len()))]
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StoreError> {
        let completed = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .set_e_tag(p.e_tag.clone())
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| self.request_error("CompleteMultipartUpload", key, e))?;

        info!("Completed multipart upload to s3://{}/{}", self.bucket, key);

        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), StoreError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| self.request_error("AbortMultipartUpload", key, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| self.request_error("PresignGetObject", key, e))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| self.request_error("PresignGetObject", key, e))?;

        Ok(presigned_request.uri().to_string())
    }
}
