//! Upload pipeline tests against the in-memory store

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use async_trait::async_trait;
use boxshelf_publisher::{
    storage::PutOptions,
    upload::{PartSource, RetryPolicy, UploadOptions, UploadPipeline},
    PublishError,
};
use bytes::Bytes;
use common::{write_box, Call, MemoryStore, TEST_BUCKET};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PART_SIZE: u64 = 8;

/// In-memory source that records every read
struct RecordingSource {
    data: Bytes,
    reads: Mutex<Vec<(u64, usize)>>,
}

impl RecordingSource {
    fn new(len: usize) -> Self {
        Self {
            data: (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into(),
            reads: Mutex::new(Vec::new()),
        }
    }

    fn reads_at(&self, offset: u64) -> Vec<(u64, usize)> {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == offset)
            .copied()
            .collect()
    }
}

#[async_trait]
impl PartSource for RecordingSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_part(&self, offset: u64, len: usize) -> std::io::Result<Bytes> {
        self.reads.lock().unwrap().push((offset, len));
        let start = offset as usize;
        Ok(self.data.slice(start..start + len))
    }
}

fn options(concurrency: usize, max_attempts: u32) -> UploadOptions {
    UploadOptions {
        part_size: PART_SIZE,
        concurrency,
        multipart_threshold: 16,
        retry: RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        },
    }
}

fn box_put() -> PutOptions {
    PutOptions {
        acl: Some("public-read".into()),
        content_type: None,
        storage_class: Some("STANDARD".into()),
    }
}

#[tokio::test]
async fn test_retried_part_rewinds_to_its_offset() {
    let store = Arc::new(MemoryStore::new(TEST_BUCKET));
    store.fail_part(3, 2);
    let pipeline = UploadPipeline::new(store.clone(), options(3, 10));
    let source = RecordingSource::new(5 * PART_SIZE as usize);

    let parts = pipeline
        .upload_multipart(&source, "base/1.0.0/base.box", &box_put())
        .await
        .expect("upload should survive two failures of part 3");

    let numbers: Vec<_> = parts.iter().map(|p| p.part_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert!(parts.iter().all(|p| p.size == PART_SIZE));

    // Part 3 starts at byte 16 and was read once per attempt, always from there
    assert_eq!(store.part_attempts(3), 3);
    assert_eq!(source.reads_at(2 * PART_SIZE), vec![(16, 8); 3]);
    for other in [1, 2, 4, 5] {
        assert_eq!(store.part_attempts(other), 1);
    }

    let completes: Vec<_> = store
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Complete { .. }))
        .collect();
    assert_eq!(
        completes,
        vec![Call::Complete {
            part_numbers: vec![1, 2, 3, 4, 5]
        }]
    );

    let object = store.object("base/1.0.0/base.box").unwrap();
    assert_eq!(object.body, source.data);
    assert_eq!(object.options, box_put());
}

#[tokio::test]
async fn test_exhausted_part_aborts_without_completion() {
    let store = Arc::new(MemoryStore::new(TEST_BUCKET));
    store.fail_part(2, 100);
    let pipeline = UploadPipeline::new(store.clone(), options(1, 3));
    let source = RecordingSource::new(3 * PART_SIZE as usize);

    let err = pipeline
        .upload_multipart(&source, "base/1.0.0/base.box", &box_put())
        .await
        .unwrap_err();

    match err {
        PublishError::PartRetriesExhausted {
            ref bucket,
            ref key,
            part_number,
            attempts,
            ..
        } => {
            assert_eq!(bucket, TEST_BUCKET);
            assert_eq!(key, "base/1.0.0/base.box");
            assert_eq!(part_number, 2);
            assert_eq!(attempts, 3);
        },
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(store.part_attempts(2), 3);
    let calls = store.calls();
    assert!(calls.contains(&Call::Abort("base/1.0.0/base.box".into())));
    assert!(!calls.iter().any(|c| matches!(c, Call::Complete { .. })));
    assert!(store.object("base/1.0.0/base.box").is_none());
}

#[tokio::test]
async fn test_small_file_single_put() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_box(dir.path(), "small.box", b"tiny box contents");
    let store = Arc::new(MemoryStore::new(TEST_BUCKET));
    let pipeline = UploadPipeline::new(store.clone(), options(2, 10));

    let outcome = pipeline
        .upload_file(&path, "base/0.1.0/small.box", &box_put())
        .await
        .unwrap();

    assert_eq!(outcome.parts, 0);
    assert_eq!(outcome.size, 17);
    assert_eq!(store.calls(), vec![Call::Put("base/0.1.0/small.box".into())]);

    let object = store.object("base/0.1.0/small.box").unwrap();
    assert_eq!(&object.body[..], b"tiny box contents");
    assert_eq!(object.options.acl.as_deref(), Some("public-read"));
    assert_eq!(object.options.storage_class.as_deref(), Some("STANDARD"));
}

#[tokio::test]
async fn test_large_file_goes_multipart() {
    let dir = tempfile::tempdir().unwrap();
    let contents: Vec<u8> = (0..44u8).collect();
    let path = write_box(dir.path(), "large.box", &contents);
    let store = Arc::new(MemoryStore::new(TEST_BUCKET));
    store.fail_part(4, 1);
    let pipeline = UploadPipeline::new(store.clone(), options(4, 10));

    let outcome = pipeline
        .upload_file(&path, "base/0.1.0/large.box", &box_put())
        .await
        .unwrap();

    // 44 bytes in parts of 8: five full parts and a 4 byte tail
    assert_eq!(outcome.parts, 6);
    assert_eq!(outcome.size, 44);
    assert_eq!(store.part_attempts(4), 2);
    assert!(!store.calls().contains(&Call::Put("base/0.1.0/large.box".into())));

    let object = store.object("base/0.1.0/large.box").unwrap();
    assert_eq!(&object.body[..], &contents[..]);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let store = Arc::new(MemoryStore::new(TEST_BUCKET));
    let pipeline = UploadPipeline::new(store.clone(), UploadOptions::default());

    let err = pipeline
        .upload_file(std::path::Path::new("/nope/missing.box"), "k", &box_put())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Io { .. }));
    assert!(store.calls().is_empty());
}
