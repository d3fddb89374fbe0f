//! `boxshelf publish` command implementation

use std::path::PathBuf;

use anyhow::Result;
use boxshelf_publisher::{artifact::BoxArtifact, status::TracingSink};

use crate::TargetArgs;

/// Publish one box and print the manifest URL
pub async fn run(
    box_file: PathBuf,
    builder: String,
    producer: String,
    target: &TargetArgs,
) -> Result<()> {
    let artifact = BoxArtifact::new(producer, builder, vec![box_file]);

    // Reject the input before any network traffic
    artifact.box_file()?;

    let publisher = super::connect(target).await?;
    let published = publisher.publish(&artifact, &TracingSink).await?;

    println!("{}", published.url);
    Ok(())
}
