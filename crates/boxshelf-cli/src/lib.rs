//! Boxshelf CLI Library
//!
//! Command-line front end for publishing Vagrant boxes to S3.
//!
//! - **Publish**: upload a box and record it in the manifest (`boxshelf publish`)
//! - **Next version**: show the version a publish without `--version` would use
//!   (`boxshelf next-version`)

pub mod commands;

use boxshelf_publisher::config::parse_duration;
use boxshelf_publisher::storage::config::CredentialSource;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Boxshelf - Vagrant box publisher for S3
#[derive(Parser, Debug)]
#[command(name = "boxshelf")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a box and add it to the manifest
    Publish {
        /// Box file to publish
        #[arg(long = "box", value_name = "PATH")]
        box_file: PathBuf,

        /// Builder that produced the box (virtualbox, vmware, parallels, ...)
        #[arg(long)]
        builder: String,

        /// Id of the step that produced the box
        #[arg(long, default_value = "vagrant")]
        producer: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the version the next publish without --version would use
    NextVersion {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Where and how boxes are published
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// AWS region of the bucket (falls back to AWS_REGION)
    #[arg(long, env = "BOXSHELF_REGION")]
    pub region: Option<String>,

    #[arg(long, env = "BOXSHELF_BUCKET")]
    pub bucket: Option<String>,

    /// Key of the manifest document
    #[arg(long, env = "BOXSHELF_MANIFEST")]
    pub manifest: Option<String>,

    /// Box name recorded in a new manifest
    #[arg(long, env = "BOXSHELF_BOX_NAME")]
    pub box_name: Option<String>,

    /// Key prefix boxes are stored under
    #[arg(long, env = "BOXSHELF_BOX_DIR")]
    pub box_dir: Option<String>,

    /// Explicit version; defaults to the next minor of the latest published
    #[arg(long, env = "BOXSHELF_VERSION")]
    pub version: Option<String>,

    /// Canned ACL for the box and the manifest [default: public-read]
    #[arg(long, env = "BOXSHELF_ACL")]
    pub acl: Option<String>,

    /// Storage class for the box [default: STANDARD]
    #[arg(long, env = "BOXSHELF_STORAGE_CLASS")]
    pub storage_class: Option<String>,

    /// CDN host serving the bucket
    #[arg(long, env = "BOXSHELF_CLOUDFRONT")]
    pub cloudfront: Option<String>,

    /// Publish presigned box URLs valid this long (e.g. 12h, 7d)
    #[arg(long, env = "BOXSHELF_SIGNED_EXPIRY", value_parser = parse_duration)]
    pub signed_expiry: Option<Duration>,

    /// Multipart chunk size in bytes
    #[arg(long, env = "BOXSHELF_PART_SIZE")]
    pub part_size: Option<u64>,

    /// Parallel part uploads
    #[arg(long, env = "BOXSHELF_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Custom S3 endpoint such as a MinIO server
    #[arg(long, env = "BOXSHELF_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Shared credentials profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

impl TargetArgs {
    pub fn credentials(&self) -> CredentialSource {
        CredentialSource::select(
            self.access_key_id.clone(),
            self.secret_key.clone(),
            self.session_token.clone(),
            self.profile.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "boxshelf",
            "publish",
            "--box",
            "out/base.box",
            "--builder",
            "vmware",
            "--bucket",
            "boxes",
            "--signed-expiry",
            "1h30m",
            "--concurrency",
            "8",
        ])
        .unwrap();

        let Commands::Publish {
            box_file,
            builder,
            producer,
            target,
        } = cli.command
        else {
            panic!("expected publish");
        };
        assert_eq!(box_file, PathBuf::from("out/base.box"));
        assert_eq!(builder, "vmware");
        assert_eq!(producer, "vagrant");
        assert_eq!(target.bucket.as_deref(), Some("boxes"));
        assert_eq!(target.signed_expiry, Some(Duration::from_secs(5400)));
        assert_eq!(target.concurrency, Some(8));
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = Cli::try_parse_from([
            "boxshelf",
            "next-version",
            "--signed-expiry",
            "soon",
        ]);
        assert!(result.is_err());
    }
}
