//! Change notifications for readers outside the library (the hook process).

use std::fs;
use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;
use crate::events::ConfigChanged;
use crate::fsutil::make_world_readable;

/// Identifier observers subscribe to for selection/config changes.
pub const CONFIG_CHANGE_URI: &str = "content://com.example.camswap.provider/config";

pub trait ChangeNotifier: Send + Sync {
    /// Dispatch a change signal for `uri`. Delivery is never awaited.
    fn notify_change(&self, uri: &str) -> Result<()>;
}

/// Send a change signal, logging instead of failing.
pub fn notify_quietly(notifier: &dyn ChangeNotifier, uri: &str) {
    match notifier.notify_change(uri) {
        Ok(()) => debug!(uri, "change notification sent"),
        Err(err) => warn!(uri, error = %err, "change notification failed"),
    }
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ConfigChanged>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChanged> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify_change(&self, uri: &str) -> Result<()> {
        // Zero subscribers is fine.
        let _ = self.tx.send(ConfigChanged {
            uri: uri.to_string(),
        });
        Ok(())
    }
}

/// Rewrites a stamp file on every change so other processes can watch it.
#[derive(Debug, Clone)]
pub struct StampFileNotifier {
    path: PathBuf,
}

impl StampFileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChangeNotifier for StampFileNotifier {
    fn notify_change(&self, uri: &str) -> Result<()> {
        let stamp = format!("{uri}\n{}\n", chrono::Utc::now().to_rfc3339());
        fs::write(&self.path, stamp)?;
        make_world_readable(&self.path);
        Ok(())
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
    fn notify_change(&self, _uri: &str) -> Result<()> {
        Ok(())
    }
}
