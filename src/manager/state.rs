//! Subscription lifecycle states and status transitions
//!
//! The transition logic is kept as pure functions so the mapping from
//! adapter status signals to lifecycle states can be tested without a
//! running manager.

use crate::adapter::{ChannelHandle, ChannelStatus};
use crate::config::SubscriptionConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Lifecycle state of a single subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No live channel; the backend closed the channel or none was opened yet
    Disconnected,
    /// Channel created, waiting for the backend to confirm the subscription
    Connecting,
    /// Backend confirmed the subscription; change events flow
    Connected,
    /// A reconnect attempt is in progress
    Reconnecting,
    /// The channel failed; a retry may be pending
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Callback invoked with the payload of each change event on a subscription
pub type EventCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// An armed reconnect timer
///
/// The token identifies this arming; a fire whose token no longer matches
/// belongs to a replaced timer and must be ignored. Dropping the timer
/// aborts the sleeping task, so re-arming cancels the previous schedule.
pub(crate) struct ReconnectTimer {
    pub token: u64,
    pub task: JoinHandle<()>,
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Book-keeping record for one tracked subscription
pub(crate) struct SubscriptionInfo {
    pub id: String,
    pub config: SubscriptionConfig,
    /// Name of the current channel incarnation; events carrying another
    /// name are stale and dropped
    pub channel: String,
    pub handle: Option<ChannelHandle>,
    pub callback: EventCallback,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub reconnect_count: u32,
    /// Registration order, used to keep listing output stable
    pub seq: u64,
    pub state: ConnectionState,
    pub pending_reconnect: Option<ReconnectTimer>,
}

impl SubscriptionInfo {
    /// Abort any pending reconnect timer
    pub fn cancel_pending_reconnect(&mut self) {
        self.pending_reconnect = None;
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn snapshot(&self, now: Instant) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            id: self.id.clone(),
            resource: self.config.resource.clone(),
            state: self.state,
            reconnect_count: self.reconnect_count,
            idle: self.idle(now),
            age: now.saturating_duration_since(self.created_at),
        }
    }
}

/// Caller-visible view of one subscription's observable fields
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub resource: String,
    pub state: ConnectionState,
    pub reconnect_count: u32,
    /// Time since the last recorded activity
    pub idle: Duration,
    /// Time since the subscription was registered
    pub age: Duration,
}

/// Side effect the manager must perform alongside a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusAction {
    /// State change only
    None,
    /// Cancel any pending reconnect timer and refresh activity
    ClearPendingReconnect,
    /// Hand the subscription to the reconnect scheduler
    ScheduleReconnect,
}

/// Outcome of applying one adapter status signal
#[derive(Debug)]
pub(crate) struct StatusTransition {
    pub next: ConnectionState,
    pub action: StatusAction,
    /// Error text to record in the connection metrics, if any
    pub recorded_error: Option<String>,
}

/// Map an adapter status signal to the next state and required side effect
pub(crate) fn apply_status(status: ChannelStatus, error: Option<&str>) -> StatusTransition {
    match status {
        ChannelStatus::Subscribed => StatusTransition {
            next: ConnectionState::Connected,
            action: StatusAction::ClearPendingReconnect,
            recorded_error: None,
        },
        ChannelStatus::ChannelError | ChannelStatus::TimedOut => StatusTransition {
            next: ConnectionState::Error,
            action: StatusAction::ScheduleReconnect,
            recorded_error: Some(match error {
                Some(detail) => format!("{status}: {detail}"),
                None => status.to_string(),
            }),
        },
        ChannelStatus::Closed => StatusTransition {
            next: ConnectionState::Disconnected,
            action: StatusAction::None,
            recorded_error: None,
        },
    }
}

/// Log a state transition at a level matching its severity
pub(crate) fn log_state_transition(id: &str, from: ConnectionState, to: ConnectionState) {
    if from == to {
        return;
    }
    match to {
        ConnectionState::Connected => {
            info!(id = %id, %from, %to, "subscription active");
        }
        ConnectionState::Error => {
            warn!(id = %id, %from, %to, "subscription channel failed");
        }
        ConnectionState::Disconnected => {
            info!(id = %id, %from, %to, "subscription channel closed");
        }
        ConnectionState::Connecting | ConnectionState::Reconnecting => {
            info!(id = %id, %from, %to, "subscription state changed");
        }
    }
}
