//! `boxshelf next-version` command implementation

use anyhow::Result;

use crate::TargetArgs;

/// Print the version a publish without `--version` would choose
pub async fn run(target: &TargetArgs) -> Result<()> {
    let publisher = super::connect(target).await?;
    let manifest = publisher.fetch_manifest().await?;

    tracing::info!(
        versions = manifest.versions.len(),
        latest = %manifest.latest_version(),
        "Fetched manifest"
    );

    println!("{}", manifest.next_version());
    Ok(())
}
