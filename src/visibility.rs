//! Host visibility signal
//!
//! UI embedders feed foreground/background transitions into the manager via a
//! watch channel; server and worker environments simply never construct one,
//! which disables foreground rechecks entirely.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Host application visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// The client is interactive; timers and sockets run normally
    #[default]
    Foreground,
    /// The host may throttle or suspend timers and network activity
    Background,
}

/// Watch channel pair for feeding visibility transitions to a manager
///
/// The receiver side is handed to `ConnectionManager::with_visibility`; the
/// embedder keeps the sender and pushes transitions as the host reports them.
pub fn visibility_channel() -> (watch::Sender<Visibility>, watch::Receiver<Visibility>) {
    watch::channel(Visibility::Foreground)
}
