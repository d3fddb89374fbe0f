//! Boxshelf Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the Boxshelf workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`BoxshelfError`] type and [`Result`] alias
//! - **Checksums**: streaming SHA-256 digests of box files
//! - **Logging**: one `tracing` setup for every binary
//!
//! # Example
//!
//! ```no_run
//! use boxshelf_common::{checksum, Result};
//!
//! fn print_digest(path: &str) -> Result<()> {
//!     let digest = checksum::digest(path)?;
//!     println!("sha256 {}", digest);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{BoxshelfError, Result};
