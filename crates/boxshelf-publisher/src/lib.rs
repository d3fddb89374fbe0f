//! Boxshelf Publisher
//!
//! Publishes Vagrant boxes to an S3 bucket and keeps the box manifest in the
//! same bucket up to date.
//!
//! # Overview
//!
//! - **Manifest**: the version/provider index and its versioning rules
//! - **Storage**: the [`storage::ObjectStore`] capability and its S3 backend
//! - **Upload**: single-shot and multipart uploads with per-part retry
//! - **Publish**: the orchestrator tying it all together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use boxshelf_publisher::{
//!     artifact::BoxArtifact,
//!     config::{PublishConfig, PublishSettings},
//!     status::TracingSink,
//!     storage::{config::StoreConfig, S3Store},
//!     Publisher,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = PublishSettings {
//!     region: Some("us-east-1".into()),
//!     bucket: Some("boxes".into()),
//!     manifest: Some("base/manifest.json".into()),
//!     box_name: Some("acme/base".into()),
//!     box_dir: Some("base".into()),
//!     ..Default::default()
//! };
//! let store = S3Store::connect(&StoreConfig::from_env()).await;
//! let config = PublishConfig::from_settings_checked(settings, &store).await?;
//!
//! let publisher = Publisher::new(config, Arc::new(store));
//! let artifact = BoxArtifact::new("vagrant", "virtualbox", vec!["output/base.box".into()]);
//! let published = publisher.publish(&artifact, &TracingSink).await?;
//! println!("{}", published);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod manifest;
pub mod publish;
pub mod status;
pub mod storage;
pub mod upload;
pub mod url;

// Re-export commonly used types
pub use error::{PublishError, Result};
pub use manifest::Manifest;
pub use publish::Publisher;
