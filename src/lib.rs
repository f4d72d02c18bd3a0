//! livefeed - realtime subscription management
//!
//! A client-side manager for many concurrent subscriptions to a change-feed
//! backend, including:
//! - Subscription registry with a hard capacity ceiling
//! - Automatic reconnection with capped exponential backoff
//! - Heartbeat monitoring and stale-connection recovery on foreground resume
//! - Connection metrics and an aggregate health check
//! - Injected channel adapter and clock, so everything runs against mocks
//!
//! # Quick Start
//!
//! ```rust
//! use livefeed::testing::{settle, ManualClock, MockChannelAdapter};
//! use livefeed::{
//!     ChannelStatus, ConnectionManager, ConnectionState, ManagerConfig, SubscriptionConfig,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let adapter = Arc::new(MockChannelAdapter::new());
//! let clock = Arc::new(ManualClock::new());
//! let manager = ConnectionManager::new(ManagerConfig::default(), adapter.clone(), clock);
//!
//! // Watch the "orders" resource; defaults give three reconnect attempts
//! // with exponential backoff starting at one second
//! manager
//!     .subscribe("orders-feed", SubscriptionConfig::new("orders"), |payload| {
//!         println!("change: {payload}");
//!     })
//!     .await
//!     .unwrap();
//!
//! // The backend (here the mock) confirms the subscription
//! adapter
//!     .emit_status("orders-feed", ChannelStatus::Subscribed, None)
//!     .await;
//! settle().await;
//!
//! assert_eq!(
//!     manager.subscription_status("orders-feed").await,
//!     Some(ConnectionState::Connected)
//! );
//! assert!(manager.health_check().await.healthy);
//! # });
//! ```

pub mod adapter;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod testing;
pub mod visibility;

pub use adapter::{
    AdapterError, ChangeFilter, ChannelAdapter, ChannelEvent, ChannelEventSender, ChannelHandle,
    ChannelRequest, ChannelSignal, ChannelStatus,
};
pub use clock::{Clock, SleepFuture, TokioClock};
pub use config::{ChangeKind, ConfigError, ManagerConfig, SubscriptionConfig};
pub use error::{ManagerError, ManagerResult};
pub use logging::{init_default_logging, init_logging, LogFormat};
pub use manager::state::{ConnectionState, EventCallback, SubscriptionSnapshot};
pub use manager::ConnectionManager;
pub use metrics::{ConnectionMetrics, HealthSnapshot, LastError, MetricsSnapshot};
pub use visibility::{visibility_channel, Visibility};
