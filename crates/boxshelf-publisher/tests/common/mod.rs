//! Shared test utilities: an in-memory object store with failure injection and
//! a status sink that records what it was told.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use boxshelf_publisher::{
    config::PublishSettings,
    status::StatusSink,
    storage::{ObjectBody, ObjectStore, PutOptions, StoreError, UploadedPart},
    Manifest,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Default bucket for in-memory tests
pub const TEST_BUCKET: &str = "boxes";

pub const MANIFEST_KEY: &str = "base/manifest.json";

/// Settings every publish test starts from
pub fn test_settings() -> PublishSettings {
    PublishSettings {
        region: Some("eu-west-1".into()),
        bucket: Some(TEST_BUCKET.into()),
        manifest: Some(MANIFEST_KEY.into()),
        box_name: Some("acme/base".into()),
        box_dir: Some("base".into()),
        ..Default::default()
    }
}

/// Write a fake box file and return its path
pub fn write_box(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub options: PutOptions,
}

/// Every call the store received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    HeadBucket,
    Get(String),
    Put(String),
    CreateMultipart(String),
    UploadPart { part_number: i32, len: usize },
    Complete { part_numbers: Vec<i32> },
    Abort(String),
    Presign(String),
}

#[derive(Debug, Default)]
struct PendingUpload {
    key: String,
    options: PutOptions,
    parts: HashMap<i32, Bytes>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    bucket: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    uploads: Mutex<HashMap<String, PendingUpload>>,
    /// Remaining injected failures per part number
    part_failures: Mutex<HashMap<i32, u32>>,
    calls: Mutex<Vec<Call>>,
    fail_head_bucket: Mutex<bool>,
    fail_gets: Mutex<bool>,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    /// Make the next `times` uploads of `part_number` fail
    pub fn fail_part(&self, part_number: i32, times: u32) {
        self.part_failures.lock().unwrap().insert(part_number, times);
    }

    pub fn fail_head_bucket(&self) {
        *self.fail_head_bucket.lock().unwrap() = true;
    }

    pub fn fail_gets(&self) {
        *self.fail_gets.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn manifest(&self, key: &str) -> Manifest {
        let object = self.object(key).expect("manifest should exist");
        Manifest::from_json(&object.body).unwrap()
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: body.into(),
                options: PutOptions::default(),
            },
        );
    }

    pub fn part_attempts(&self, part_number: i32) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::UploadPart { part_number: n, .. } if *n == part_number))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn error(&self, op: &'static str, key: &str, message: &str) -> StoreError {
        StoreError::request(op, &self.bucket, key, message)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> Result<(), StoreError> {
        self.record(Call::HeadBucket);
        if *self.fail_head_bucket.lock().unwrap() {
            return Err(self.error("HeadBucket", "", "403 Forbidden"));
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StoreError> {
        self.record(Call::Get(key.to_string()));
        if *self.fail_gets.lock().unwrap() {
            return Err(self.error("GetObject", key, "503 Slow Down"));
        }
        self.object(key)
            .map(|o| o.body)
            .ok_or_else(|| StoreError::NotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            })
    }

    async fn put_object(
        &self,
        key: &str,
        body: ObjectBody,
        options: &PutOptions,
    ) -> Result<(), StoreError> {
        self.record(Call::Put(key.to_string()));
        let body = match body {
            ObjectBody::Bytes(bytes) => bytes,
            ObjectBody::File(path) => Bytes::from(std::fs::read(path).unwrap()),
        };
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                options: options.clone(),
            },
        );
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        options: &PutOptions,
    ) -> Result<String, StoreError> {
        self.record(Call::CreateMultipart(key.to_string()));
        let mut uploads = self.uploads.lock().unwrap();
        let upload_id = format!("upload-{}", uploads.len() + 1);
        uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                options: options.clone(),
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<UploadedPart, StoreError> {
        self.record(Call::UploadPart {
            part_number,
            len: body.len(),
        });

        // Let sibling parts interleave so completion order is not submission order
        tokio::task::yield_now().await;

        {
            let mut failures = self.part_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&part_number) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(self.error("UploadPart", key, "connection reset by peer"));
                }
            }
        }

        let size = body.len() as u64;
        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads
            .get_mut(upload_id)
            .ok_or_else(|| self.error("UploadPart", key, "no such upload"))?;
        upload.parts.insert(part_number, body);

        Ok(UploadedPart {
            part_number,
            e_tag: Some(format!("\"etag-{}\"", part_number)),
            size,
        })
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StoreError> {
        self.record(Call::Complete {
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
        });

        let upload = self
            .uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or_else(|| self.error("CompleteMultipartUpload", key, "no such upload"))?;

        let mut body = Vec::new();
        for part in parts {
            let bytes = upload
                .parts
                .get(&part.part_number)
                .ok_or_else(|| self.error("CompleteMultipartUpload", key, "missing part"))?;
            body.extend_from_slice(bytes);
        }

        self.objects.lock().unwrap().insert(
            upload.key,
            StoredObject {
                body: Bytes::from(body),
                options: upload.options,
            },
        );
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), StoreError> {
        self.record(Call::Abort(key.to_string()));
        self.uploads.lock().unwrap().remove(upload_id);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        self.record(Call::Presign(key.to_string()));
        Ok(format!(
            "https://presigned.example/{}/{}?expires={}",
            self.bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

/// Status sink that keeps every line
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl StatusSink for RecordingSink {
    fn say(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn message(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}
