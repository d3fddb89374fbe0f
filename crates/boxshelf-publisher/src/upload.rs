//! Box upload pipeline
//!
//! Small boxes go up in one streaming put. Boxes above the multipart threshold
//! are cut into fixed-size parts that are uploaded through a bounded worker
//! pool. A failed part is retried from its own start offset; when one part runs
//! out of attempts the upload is aborted and nothing is completed.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PartFailure, PublishError, Result};
use crate::storage::{ObjectBody, ObjectStore, PutOptions, UploadedPart};

const MIB: u64 = 1024 * 1024;

/// Default size of one multipart chunk
pub const DEFAULT_PART_SIZE: u64 = 5 * MIB;

/// Smallest part size S3 accepts for every part but the last
pub const MIN_PART_SIZE: u64 = 5 * MIB;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Most parts S3 accepts in one multipart upload
pub const MAX_PARTS: u64 = 10_000;

/// Files larger than this use multipart upload
pub const MULTIPART_THRESHOLD: u64 = 100 * MIB;

pub const DEFAULT_PART_ATTEMPTS: u32 = 10;

pub const DEFAULT_PART_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fixed-delay retry bound for a single part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per part, first try included
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PART_ATTEMPTS,
            delay: DEFAULT_PART_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub part_size: u64,
    pub concurrency: usize,
    pub multipart_threshold: u64,
    pub retry: RetryPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            multipart_threshold: MULTIPART_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }
}

/// Random-access bytes a multipart upload reads its parts from
#[async_trait]
pub trait PartSource: Send + Sync {
    /// Total size in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly `len` bytes starting at `offset`
    async fn read_part(&self, offset: u64, len: usize) -> std::io::Result<Bytes>;
}

/// A file on disk shared by all part workers.
///
/// There is one handle; every read seeks to the part's offset under the lock,
/// so a retried part always restarts at its first byte.
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path.as_ref()).await?;
        let len = file.metadata().await?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

#[async_trait]
impl PartSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_part(&self, offset: u64, len: usize) -> std::io::Result<Bytes> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

/// One planned part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub part_number: i32,
    pub offset: u64,
    pub len: u64,
}

/// Part size actually used for `size` bytes: `part_size`, raised when needed
/// so the upload fits in [`MAX_PARTS`] parts
pub fn effective_part_size(size: u64, part_size: u64) -> u64 {
    part_size.max(1).max(size.div_ceil(MAX_PARTS))
}

/// Cut `size` bytes into parts numbered from 1, never more than [`MAX_PARTS`]
pub fn plan_parts(size: u64, part_size: u64) -> Vec<PartPlan> {
    if size == 0 {
        return vec![PartPlan {
            part_number: 1,
            offset: 0,
            len: 0,
        }];
    }

    let part_size = effective_part_size(size, part_size);
    (1..)
        .zip(0..size.div_ceil(part_size))
        .map(|(part_number, index)| {
            let offset = index * part_size;
            PartPlan {
                part_number,
                offset,
                len: part_size.min(size - offset),
            }
        })
        .collect()
}

/// What an upload did
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub key: String,
    pub size: u64,
    /// Zero for a single-shot put
    pub parts: usize,
    pub elapsed: Duration,
}

/// Places a local box at a key in the object store
pub struct UploadPipeline {
    store: Arc<dyn ObjectStore>,
    options: UploadOptions,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn ObjectStore>, options: UploadOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload `path` to `key`, choosing single-shot or multipart by size
    pub async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        put: &PutOptions,
    ) -> Result<UploadOutcome> {
        let start = Instant::now();
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| PublishError::io(path, e))?
            .len();

        let parts = if size > self.options.multipart_threshold {
            let source = FileSource::open(path)
                .await
                .map_err(|e| PublishError::io(path, e))?;
            self.upload_multipart(&source, key, put).await?.len()
        } else {
            debug!(key = %key, size, "Uploading box in a single request");
            self.store
                .put_object(key, ObjectBody::File(PathBuf::from(path)), put)
                .await?;
            0
        };

        Ok(UploadOutcome {
            key: key.to_string(),
            size,
            parts,
            elapsed: start.elapsed(),
        })
    }

    /// Multipart upload of `source` to `key`.
    ///
    /// Returns the completed parts in part-number order.
    pub async fn upload_multipart<S: PartSource>(
        &self,
        source: &S,
        key: &str,
        put: &PutOptions,
    ) -> Result<Vec<UploadedPart>> {
        let plan = plan_parts(source.len(), self.options.part_size);
        info!(
            key = %key,
            size = source.len(),
            part_size = effective_part_size(source.len(), self.options.part_size),
            parts = plan.len(),
            concurrency = self.options.concurrency,
            "Starting multipart upload"
        );

        let upload_id = self.store.create_multipart_upload(key, put).await?;

        let uploaded = stream::iter(plan)
            .map(|part| self.upload_part_with_retry(source, key, &upload_id, part))
            .buffer_unordered(self.options.concurrency.max(1))
            .try_collect::<Vec<_>>()
            .await;

        let mut parts = match uploaded {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort_err) = self.store.abort_multipart_upload(key, &upload_id).await {
                    warn!(
                        key = %key,
                        upload_id = %upload_id,
                        error = %abort_err,
                        "Failed to abort multipart upload"
                    );
                }
                return Err(e);
            },
        };

        parts.sort_by_key(|p| p.part_number);
        self.store
            .complete_multipart_upload(key, &upload_id, &parts)
            .await?;

        Ok(parts)
    }

    async fn upload_part_with_retry<S: PartSource>(
        &self,
        source: &S,
        key: &str,
        upload_id: &str,
        part: PartPlan,
    ) -> Result<UploadedPart> {
        let retry = self.options.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.upload_part_once(source, key, upload_id, part).await {
                Ok(uploaded) => {
                    debug!(part = part.part_number, attempt, "Part uploaded");
                    return Ok(uploaded);
                },
                Err(e) if attempt < max_attempts => {
                    warn!(
                        part = part.part_number,
                        offset = part.offset,
                        error = %e,
                        "Part attempt {}/{} failed, retrying in {:?}",
                        attempt,
                        max_attempts,
                        retry.delay
                    );
                    tokio::time::sleep(retry.delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    return Err(PublishError::PartRetriesExhausted {
                        bucket: self.store.bucket().to_string(),
                        key: key.to_string(),
                        part_number: part.part_number,
                        attempts: max_attempts,
                        source: e,
                    });
                },
            }
        }
    }

    async fn upload_part_once<S: PartSource>(
        &self,
        source: &S,
        key: &str,
        upload_id: &str,
        part: PartPlan,
    ) -> std::result::Result<UploadedPart, PartFailure> {
        let body = source
            .read_part(part.offset, part.len as usize)
            .await
            .map_err(PartFailure::Read)?;
        Ok(self
            .store
            .upload_part(key, upload_id, part.part_number, body)
            .await?)
    }
}
