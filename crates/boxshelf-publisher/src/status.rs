//! Status reporting for a running publish

use tracing::info;

/// Receives human-readable progress lines. Purely an observer.
pub trait StatusSink: Send + Sync {
    /// Headline for a new stage
    fn say(&self, message: &str);

    /// Detail line within a stage
    fn message(&self, message: &str);
}

/// Forwards status lines to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn say(&self, message: &str) {
        info!(target: "boxshelf::status", "==> {}", message);
    }

    fn message(&self, message: &str) {
        info!(target: "boxshelf::status", "    {}", message);
    }
}
