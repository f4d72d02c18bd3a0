//! Channel adapter boundary
//!
//! This module defines the contract between the connection manager and the
//! backend SDK that actually speaks the wire protocol. Embedders implement
//! [`ChannelAdapter`] over their driver; the manager only ever creates and
//! removes channels and consumes the [`ChannelEvent`] messages the adapter
//! delivers on the sender carried in each [`ChannelRequest`].

use crate::config::{ChangeKind, SubscriptionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by adapter implementations
///
/// These never reach the manager's callers: create/remove failures are
/// recorded into metrics and converted into reconnect scheduling.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl AdapterError {
    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Asynchronous channel status reported by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// The backend confirmed the subscription
    Subscribed,
    /// The channel failed; transient, triggers a reconnect
    ChannelError,
    /// The subscribe attempt timed out; transient, triggers a reconnect
    TimedOut,
    /// The backend closed the channel; terminal for this incarnation
    Closed,
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Subscribed => write!(f, "subscribed"),
            ChannelStatus::ChannelError => write!(f, "channel_error"),
            ChannelStatus::TimedOut => write!(f, "timed_out"),
            ChannelStatus::Closed => write!(f, "closed"),
        }
    }
}

/// One message from the adapter about a single channel
#[derive(Debug, Clone)]
pub enum ChannelSignal {
    /// Lifecycle transition, with an optional backend error description
    Status {
        status: ChannelStatus,
        error: Option<String>,
    },
    /// A change event matching the channel's filter
    Change { payload: serde_json::Value },
}

/// Envelope for adapter-to-manager delivery
///
/// `channel` is the unique channel name the event originated from; the manager
/// uses it to drop messages from torn-down channel incarnations.
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub subscription_id: String,
    pub channel: String,
    pub signal: ChannelSignal,
}

impl ChannelEvent {
    /// Build a status event
    pub fn status<S: Into<String>, C: Into<String>>(
        subscription_id: S,
        channel: C,
        status: ChannelStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            channel: channel.into(),
            signal: ChannelSignal::Status { status, error },
        }
    }

    /// Build a change event
    pub fn change<S: Into<String>, C: Into<String>>(
        subscription_id: S,
        channel: C,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            channel: channel.into(),
            signal: ChannelSignal::Change { payload },
        }
    }
}

/// Sender on which an adapter delivers events for the channels it opened
pub type ChannelEventSender = mpsc::UnboundedSender<ChannelEvent>;

/// Server-side filter attached to a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeFilter {
    pub schema: String,
    pub resource: String,
    pub events: ChangeKind,
    pub predicate: Option<String>,
}

impl ChangeFilter {
    /// Derive the wire filter from a subscription configuration
    pub fn from_config(config: &SubscriptionConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            resource: config.resource.clone(),
            events: config.events,
            predicate: config.predicate.clone(),
        }
    }
}

/// Everything an adapter needs to open one channel
#[derive(Debug)]
pub struct ChannelRequest {
    /// Unique channel name for this creation (never reused across
    /// incarnations of the same subscription)
    pub channel: String,
    /// Owning subscription id, echoed back in every event
    pub subscription_id: String,
    /// Filter to attach server-side
    pub filter: ChangeFilter,
    /// Sender for status and change events of this channel
    pub events: ChannelEventSender,
}

/// Opaque reference to an open backend channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub channel: String,
}

impl ChannelHandle {
    pub fn new<C: Into<String>>(channel: C) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

/// Adapter over the backend's channel primitives
///
/// Implementations wrap the concrete SDK to enable dependency injection and
/// testing. `create_channel` must issue the subscribe request and return
/// promptly; confirmation arrives later as a `Subscribed` status event.
#[async_trait::async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Open a channel and start delivering its events on `request.events`
    async fn create_channel(&self, request: ChannelRequest) -> Result<ChannelHandle, AdapterError>;

    /// Release all backend resources for `handle`; idempotent
    async fn remove_channel(&self, handle: ChannelHandle) -> Result<(), AdapterError>;
}

/// Unique channel name for one creation
///
/// Combines resource, subscription id, epoch-millis timestamp, and a
/// per-manager sequence number so a torn-down-and-recreated subscription never
/// collides with its previous incarnation backend-side.
pub(crate) fn unique_channel_name(resource: &str, subscription_id: &str, seq: u64) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    format!("{resource}-{subscription_id}-{timestamp}-{seq}")
}
